//! Fluent entity configuration
//!
//! ```
//! use crudkit_core::{InputDef, ObjectDef, TypeRef};
//! use crudkit_graphql::{CrudBuilder, OneToManyRelation};
//!
//! let config = CrudBuilder::new(
//!     ObjectDef::new("User")
//!         .field("id", TypeRef::named_nn(TypeRef::ID))
//!         .field("name", TypeRef::named_nn(TypeRef::STRING)),
//! )
//! .with_config(
//!     "user",
//!     InputDef::new("UserCreateInput").field("name", TypeRef::named_nn(TypeRef::STRING)),
//!     InputDef::new("UserUpdateInput").field("name", TypeRef::named(TypeRef::STRING)),
//!     InputDef::new("UserUpdateManyInput").field("name", TypeRef::named(TypeRef::STRING)),
//!     InputDef::new("UserWhereInput").field("name", TypeRef::named("StringFilter")),
//! )
//! .add_relation(OneToManyRelation::new("posts", "post", "Post", "authorId"))
//! .build();
//!
//! assert_eq!(config.relations.len(), 1);
//! ```

use crate::config::{
	BindingKind, CustomCall, CustomOperation, CustomRelation, CustomRelationConfig,
	CustomResolverConfig, EntityConfig, InvokeFn, MethodBinding, OneToManyRelation,
	OneToOneRelation, RelationConfig, SubscriptionConfig, relation_lookup, subscription_lookup,
};
use crate::module::DynamicModule;
use crate::service::CrudService;
use crudkit_core::{
	AbilityRef, ConfigError, CrudError, CrudResult, CustomRelationResolver, Entity, InputDef,
	ObjectDef, Selection, SubscriptionResolver, TypeDef,
};
use crudkit_di::{Export, Injectable, Provider};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Entry point: starts from the entity's GraphQL object type.
pub struct CrudBuilder {
	entity: ObjectDef,
}

impl CrudBuilder {
	pub fn new(entity: ObjectDef) -> Self {
		Self { entity }
	}

	/// Seeds the configuration with the model name and the four input types.
	pub fn with_config(
		self,
		model_name: impl Into<String>,
		create_input: InputDef,
		update_input: InputDef,
		update_many_input: InputDef,
		where_input: InputDef,
	) -> EntityConfigBuilder {
		EntityConfigBuilder {
			config: EntityConfig::new(
				model_name.into(),
				self.entity,
				create_input,
				update_input,
				update_many_input,
				where_input,
			),
		}
	}
}

pub struct EntityConfigBuilder {
	config: EntityConfig,
}

impl EntityConfigBuilder {
	pub fn add_relation(mut self, relation: OneToManyRelation) -> Self {
		self.config.relations.push(RelationConfig::OneToMany(relation));
		self
	}

	pub fn add_one_to_one_relation(mut self, relation: OneToOneRelation) -> Self {
		self.config.relations.push(RelationConfig::OneToOne(relation));
		self
	}

	/// Adds a relation resolving to at most one entity through `R`.
	pub fn add_custom_relation<R>(self, relation: CustomRelation) -> Self
	where
		R: CustomRelationResolver + Injectable,
	{
		self.push_custom_relation::<R>(relation, false)
	}

	/// Adds a relation resolving to a list of entities through `R`.
	pub fn add_custom_array_relation<R>(self, relation: CustomRelation) -> Self
	where
		R: CustomRelationResolver + Injectable,
	{
		self.push_custom_relation::<R>(relation, true)
	}

	fn push_custom_relation<R>(mut self, relation: CustomRelation, is_many: bool) -> Self
	where
		R: CustomRelationResolver + Injectable,
	{
		self.config
			.relations
			.push(RelationConfig::Custom(CustomRelationConfig {
				relation,
				is_many,
				factory: std::any::type_name::<R>(),
				provider: Provider::injectable::<R>(),
				lookup: relation_lookup::<R>,
			}));
		self
	}

	/// Registers `F` as the entity's custom-resolver factory.
	///
	/// Registering a different factory replaces the previous one together
	/// with its method bindings.
	pub fn with_custom_resolver<F: Injectable>(mut self) -> CustomResolverBuilder<F> {
		let resolver = match self.config.custom_resolver.take() {
			Some(existing) if existing.type_id == TypeId::of::<F>() => existing,
			previous => {
				if let Some(previous) = previous {
					tracing::debug!(
						model = %self.config.model_name,
						replaced = previous.factory,
						dropped_bindings = previous.bindings.len(),
						"custom resolver replaced"
					);
				}
				CustomResolverConfig {
					factory: std::any::type_name::<F>(),
					type_id: TypeId::of::<F>(),
					provider: Provider::injectable::<F>(),
					bindings: Vec::new(),
				}
			}
		};
		CustomResolverBuilder {
			parent: self,
			resolver,
			_factory: PhantomData,
		}
	}

	/// Reopens the bindings of an already registered factory `F`.
	pub fn custom_resolver<F: Injectable>(mut self) -> Result<CustomResolverBuilder<F>, ConfigError> {
		match self.config.custom_resolver.take() {
			Some(resolver) if resolver.type_id == TypeId::of::<F>() => Ok(CustomResolverBuilder {
				parent: self,
				resolver,
				_factory: PhantomData,
			}),
			_ => Err(ConfigError::CustomResolverNotRegistered(
				std::any::type_name::<F>(),
			)),
		}
	}

	/// Replaces the default id-list subscription filter and resolver.
	pub fn with_subscription<R>(mut self, filter: InputDef) -> Self
	where
		R: SubscriptionResolver + Injectable,
	{
		self.config.subscription = Some(SubscriptionConfig {
			filter,
			resolver: std::any::type_name::<R>(),
			provider: Provider::injectable::<R>(),
			lookup: subscription_lookup::<R>,
		});
		self
	}

	/// Replaces the default `{Model}FindManyArgs` input of `{m}FindMany`.
	pub fn with_find_many_args(mut self, args: InputDef) -> Self {
		self.config.find_many_args = Some(args);
		self
	}

	/// Authorization providers for this entity's module.
	///
	/// A provider of [`crudkit_core::SharedGuard`] here overrides the global guard.
	pub fn with_authorization<I>(mut self, providers: I) -> Self
	where
		I: IntoIterator<Item = Provider>,
	{
		self.config.authorization.extend(providers);
		self
	}

	pub fn with_providers<I>(mut self, providers: I) -> Self
	where
		I: IntoIterator<Item = Provider>,
	{
		self.config.providers.extend(providers);
		self
	}

	pub fn with_controllers<I>(mut self, controllers: I) -> Self
	where
		I: IntoIterator<Item = Provider>,
	{
		self.config.controllers.extend(controllers);
		self
	}

	pub fn import<I>(mut self, modules: I) -> Self
	where
		I: IntoIterator<Item = DynamicModule>,
	{
		self.config.imports.extend(modules);
		self
	}

	pub fn export<I>(mut self, exports: I) -> Self
	where
		I: IntoIterator<Item = Export>,
	{
		self.config.exports.extend(exports);
		self
	}

	/// Additional types referenced by this entity's fields or custom operations.
	pub fn with_types<I>(mut self, types: I) -> Self
	where
		I: IntoIterator<Item = TypeDef>,
	{
		self.config.extra_types.extend(types);
		self
	}

	pub fn build(self) -> EntityConfig {
		self.config
	}
}

/// Sub-builder binding methods of the factory `F` as GraphQL operations.
///
/// Bound methods receive, in order: the factory instance, the decoded input,
/// the request's ability, the parent entity (field resolvers only) and the
/// storage selection.
pub struct CustomResolverBuilder<F> {
	parent: EntityConfigBuilder,
	resolver: CustomResolverConfig,
	_factory: PhantomData<fn() -> F>,
}

fn decode<I: DeserializeOwned>(input: Value) -> CrudResult<I> {
	serde_json::from_value(input).map_err(|e| CrudError::invalid_argument("input", e))
}

impl<F: Injectable> CustomResolverBuilder<F> {
	fn bind(mut self, kind: BindingKind, operation: CustomOperation, invoke: InvokeFn) -> Self {
		self.resolver.bindings.push(MethodBinding {
			kind,
			operation,
			invoke,
		});
		self
	}

	fn root_invoke<I, O, M, Fut>(method: M) -> InvokeFn
	where
		I: DeserializeOwned + Send + 'static,
		O: Serialize + Send + 'static,
		M: Fn(Arc<F>, I, AbilityRef, Selection) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = CrudResult<O>> + Send + 'static,
	{
		let method = Arc::new(method);
		Arc::new(move |service: Arc<CrudService>, call: CustomCall| -> BoxFuture<'static, CrudResult<Value>> {
			let method = method.clone();
			Box::pin(async move {
				let factory = service.get_factory::<F>()?;
				let input = decode::<I>(call.input)?;
				let output = method(factory, input, call.ability, call.selection).await?;
				Ok(serde_json::to_value(output)?)
			})
		})
	}

	pub fn add_query<I, O, M, Fut>(self, operation: CustomOperation, method: M) -> Self
	where
		I: DeserializeOwned + Send + 'static,
		O: Serialize + Send + 'static,
		M: Fn(Arc<F>, I, AbilityRef, Selection) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = CrudResult<O>> + Send + 'static,
	{
		let invoke = Self::root_invoke(method);
		self.bind(BindingKind::Query, operation, invoke)
	}

	pub fn add_mutation<I, O, M, Fut>(self, operation: CustomOperation, method: M) -> Self
	where
		I: DeserializeOwned + Send + 'static,
		O: Serialize + Send + 'static,
		M: Fn(Arc<F>, I, AbilityRef, Selection) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = CrudResult<O>> + Send + 'static,
	{
		let invoke = Self::root_invoke(method);
		self.bind(BindingKind::Mutation, operation, invoke)
	}

	/// Adds a field to the entity type resolved by `method` with the parent row.
	pub fn add_resolve_field<I, O, M, Fut>(self, operation: CustomOperation, method: M) -> Self
	where
		I: DeserializeOwned + Send + 'static,
		O: Serialize + Send + 'static,
		M: Fn(Arc<F>, I, AbilityRef, Entity, Selection) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = CrudResult<O>> + Send + 'static,
	{
		let method = Arc::new(method);
		let field = operation.name.clone();
		let invoke: InvokeFn = Arc::new(move |service: Arc<CrudService>, call: CustomCall| -> BoxFuture<'static, CrudResult<Value>> {
			let method = method.clone();
			let field = field.clone();
			Box::pin(async move {
				let parent = call.parent.ok_or_else(|| {
					CrudError::invalid_argument(field, "field resolver called without a parent")
				})?;
				let factory = service.get_factory::<F>()?;
				let input = decode::<I>(call.input)?;
				let output = method(factory, input, call.ability, parent, call.selection).await?;
				Ok(serde_json::to_value(output)?)
			})
		});
		self.bind(BindingKind::ResolveField, operation, invoke)
	}

	/// Returns to the entity builder.
	pub fn and(self) -> EntityConfigBuilder {
		let mut parent = self.parent;
		parent.config.custom_resolver = Some(self.resolver);
		parent
	}

	pub fn build(self) -> EntityConfig {
		self.and().build()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use crudkit_core::{RelationOutput, TypeRef};
	use crudkit_di::{DiResult, InjectionContext};
	use rstest::rstest;

	struct Stats;

	#[async_trait]
	impl Injectable for Stats {
		async fn inject(_ctx: &InjectionContext) -> DiResult<Self> {
			Ok(Stats)
		}
	}

	struct Other;

	#[async_trait]
	impl Injectable for Other {
		async fn inject(_ctx: &InjectionContext) -> DiResult<Self> {
			Ok(Other)
		}
	}

	struct Followers;

	#[async_trait]
	impl Injectable for Followers {
		async fn inject(_ctx: &InjectionContext) -> DiResult<Self> {
			Ok(Followers)
		}
	}

	#[async_trait]
	impl CustomRelationResolver for Followers {
		async fn resolve(
			&self,
			_ability: &AbilityRef,
			_parent: &Entity,
			_selection: &Selection,
			_args: Option<Value>,
		) -> CrudResult<RelationOutput> {
			Ok(RelationOutput::Many(Vec::new()))
		}
	}

	fn builder() -> EntityConfigBuilder {
		CrudBuilder::new(ObjectDef::new("User").field("id", TypeRef::named_nn(TypeRef::ID)))
			.with_config(
				"user",
				InputDef::new("UserCreateInput"),
				InputDef::new("UserUpdateInput"),
				InputDef::new("UserUpdateManyInput"),
				InputDef::new("UserWhereInput"),
			)
	}

	async fn count(_stats: Arc<Stats>, _input: (), _ability: AbilityRef, _selection: Selection) -> CrudResult<i64> {
		Ok(3)
	}

	#[rstest]
	fn test_relations_keep_insertion_order() {
		let config = builder()
			.add_relation(OneToManyRelation::new("posts", "post", "Post", "authorId"))
			.add_one_to_one_relation(OneToOneRelation::new("profile", "profile", "Profile", "profileId"))
			.add_custom_array_relation::<Followers>(CustomRelation::new("followers", "User"))
			.build();

		let fields: Vec<&str> = config.relations.iter().map(RelationConfig::field).collect();
		assert_eq!(fields, ["posts", "profile", "followers"]);
		match &config.relations[2] {
			RelationConfig::Custom(custom) => {
				assert!(custom.is_many);
				assert_eq!(custom.relation.target_type, "User");
			}
			_ => panic!("Expected custom relation"),
		}
	}

	#[rstest]
	fn test_custom_bindings_accumulate() {
		let config = builder()
			.with_custom_resolver::<Stats>()
			.add_query(CustomOperation::new("userCount", TypeRef::named(TypeRef::INT)), count)
			.add_mutation(CustomOperation::new("userRecount", TypeRef::named(TypeRef::INT)), count)
			.and()
			.build();

		let resolver = config.custom_resolver.unwrap();
		let kinds: Vec<BindingKind> = resolver.bindings.iter().map(|b| b.kind).collect();
		assert_eq!(kinds, [BindingKind::Query, BindingKind::Mutation]);
	}

	#[rstest]
	fn test_reopening_unregistered_factory_fails() {
		let err = builder().custom_resolver::<Stats>().err().unwrap();

		assert!(err.to_string().contains("custom resolver class not registered"));
	}

	#[rstest]
	fn test_reopening_registered_factory_keeps_bindings() {
		let config = builder()
			.with_custom_resolver::<Stats>()
			.add_query(CustomOperation::new("userCount", TypeRef::named(TypeRef::INT)), count)
			.and()
			.custom_resolver::<Stats>()
			.unwrap()
			.add_mutation(CustomOperation::new("userRecount", TypeRef::named(TypeRef::INT)), count)
			.build();

		assert_eq!(config.custom_resolver.unwrap().bindings.len(), 2);
	}

	#[rstest]
	fn test_replacing_factory_drops_bindings() {
		let config = builder()
			.with_custom_resolver::<Stats>()
			.add_query(CustomOperation::new("userCount", TypeRef::named(TypeRef::INT)), count)
			.and()
			.with_custom_resolver::<Other>()
			.and()
			.build();

		let resolver = config.custom_resolver.unwrap();
		assert!(resolver.factory.ends_with("Other"));
		assert!(resolver.bindings.is_empty());
	}
}
