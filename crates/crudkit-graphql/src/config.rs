//! Entity configuration values
//!
//! An [`EntityConfig`] is accumulated by [`crate::CrudBuilder`] and consumed
//! once by [`crate::CrudModule::for_root`]. Nothing here performs I/O.

use crate::module::DynamicModule;
use crate::registry::ArgumentDef;
use crate::service::CrudService;
use convert_case::{Case, Casing};
use crudkit_core::{
	AbilityRef, CrudResult, CustomRelationResolver, Entity, InputDef, ObjectDef, Permission,
	Selection, SubscriptionResolver, TypeDef, TypeRef,
};
use crudkit_di::{DiResult, Export, InjectionContext, Provider};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::any::TypeId;
use std::sync::Arc;

/// Everything needed to generate one entity's module.
#[derive(Clone)]
pub struct EntityConfig {
	pub model_name: String,
	pub entity: ObjectDef,
	pub create_input: InputDef,
	pub update_input: InputDef,
	pub update_many_input: InputDef,
	pub where_input: InputDef,
	/// Replaces the default `{Model}FindManyArgs` input.
	pub find_many_args: Option<InputDef>,
	pub relations: Vec<RelationConfig>,
	pub custom_resolver: Option<CustomResolverConfig>,
	pub subscription: Option<SubscriptionConfig>,
	pub authorization: Vec<Provider>,
	pub providers: Vec<Provider>,
	pub imports: Vec<DynamicModule>,
	pub exports: Vec<Export>,
	pub controllers: Vec<Provider>,
	pub extra_types: Vec<TypeDef>,
}

impl EntityConfig {
	pub(crate) fn new(
		model_name: String,
		entity: ObjectDef,
		create_input: InputDef,
		update_input: InputDef,
		update_many_input: InputDef,
		where_input: InputDef,
	) -> Self {
		Self {
			model_name,
			entity,
			create_input,
			update_input,
			update_many_input,
			where_input,
			find_many_args: None,
			relations: Vec::new(),
			custom_resolver: None,
			subscription: None,
			authorization: Vec::new(),
			providers: Vec::new(),
			imports: Vec::new(),
			exports: Vec::new(),
			controllers: Vec::new(),
			extra_types: Vec::new(),
		}
	}

	/// GraphQL name of the entity object type.
	pub fn entity_type(&self) -> &str {
		&self.entity.name
	}

	/// Model name in PascalCase, used for generated type names.
	pub fn model_pascal(&self) -> String {
		self.model_name.to_case(Case::Pascal)
	}

	pub fn module_name(&self) -> String {
		format!("{}CrudModule", self.entity.name)
	}

	pub fn find_many_args_type(&self) -> String {
		match &self.find_many_args {
			Some(custom) => custom.name.clone(),
			None => format!("{}FindManyArgs", self.model_pascal()),
		}
	}

	/// Default find-many argument input: `{ where, pagination }`.
	pub fn default_find_many_args(&self) -> InputDef {
		InputDef::new(format!("{}FindManyArgs", self.model_pascal()))
			.field("where", TypeRef::named(self.where_input.name.clone()))
			.field(
				"pagination",
				TypeRef::named(crudkit_core::types::PAGINATION_INPUT),
			)
	}

	/// Names of entity fields that are resolved by synthesized resolvers
	/// rather than read from storage.
	pub fn computed_fields(&self) -> Vec<&str> {
		let mut fields: Vec<&str> = self.relations.iter().map(RelationConfig::field).collect();
		if let Some(custom) = &self.custom_resolver {
			fields.extend(
				custom
					.bindings
					.iter()
					.filter(|b| b.kind == BindingKind::ResolveField)
					.map(|b| b.operation.name.as_str()),
			);
		}
		fields
	}

	/// Fields resolved by hand-written code that may read any column of the parent.
	pub fn opaque_fields(&self) -> Vec<&str> {
		let mut fields: Vec<&str> = self
			.relations
			.iter()
			.filter_map(|r| match r {
				RelationConfig::Custom(rel) => Some(rel.relation.field.as_str()),
				_ => None,
			})
			.collect();
		if let Some(custom) = &self.custom_resolver {
			fields.extend(
				custom
					.bindings
					.iter()
					.filter(|b| b.kind == BindingKind::ResolveField)
					.map(|b| b.operation.name.as_str()),
			);
		}
		fields
	}

	/// Foreign keys the entity must always carry for its one-to-one relations.
	pub fn one_to_one_keys(&self) -> Vec<&str> {
		self.relations
			.iter()
			.filter_map(|r| match r {
				RelationConfig::OneToOne(rel) => Some(rel.foreign_key.as_str()),
				_ => None,
			})
			.collect()
	}
}

/// One relation field of an entity.
#[derive(Clone)]
pub enum RelationConfig {
	OneToMany(OneToManyRelation),
	OneToOne(OneToOneRelation),
	Custom(CustomRelationConfig),
}

impl RelationConfig {
	pub fn field(&self) -> &str {
		match self {
			Self::OneToMany(rel) => &rel.field,
			Self::OneToOne(rel) => &rel.field,
			Self::Custom(rel) => &rel.relation.field,
		}
	}
}

/// `parent.field` lists rows of `target_model` whose `foreign_key` is the parent's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToManyRelation {
	pub field: String,
	pub target_model: String,
	pub target_type: String,
	pub target_where: Option<String>,
	pub where_nullable: bool,
	pub foreign_key: String,
}

impl OneToManyRelation {
	pub fn new(
		field: impl Into<String>,
		target_model: impl Into<String>,
		target_type: impl Into<String>,
		foreign_key: impl Into<String>,
	) -> Self {
		Self {
			field: field.into(),
			target_model: target_model.into(),
			target_type: target_type.into(),
			target_where: None,
			where_nullable: true,
			foreign_key: foreign_key.into(),
		}
	}

	/// Exposes `where` and `pagination` arguments on the relation field.
	pub fn with_where(mut self, where_type: impl Into<String>, nullable: bool) -> Self {
		self.target_where = Some(where_type.into());
		self.where_nullable = nullable;
		self
	}
}

/// `parent.field` is the row of `target_model` whose id is `parent.foreign_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneToOneRelation {
	pub field: String,
	pub target_model: String,
	pub target_type: String,
	pub foreign_key: String,
	pub nullable: bool,
}

impl OneToOneRelation {
	pub fn new(
		field: impl Into<String>,
		target_model: impl Into<String>,
		target_type: impl Into<String>,
		foreign_key: impl Into<String>,
	) -> Self {
		Self {
			field: field.into(),
			target_model: target_model.into(),
			target_type: target_type.into(),
			foreign_key: foreign_key.into(),
			nullable: true,
		}
	}

	pub fn nullable(mut self, nullable: bool) -> Self {
		self.nullable = nullable;
		self
	}
}

/// Shape of a hand-resolved relation field.
///
/// The target type stays singular; cardinality is chosen by the builder call
/// that registers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRelation {
	pub field: String,
	pub target_type: String,
	pub target_where: Option<String>,
	pub where_nullable: bool,
}

impl CustomRelation {
	pub fn new(field: impl Into<String>, target_type: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			target_type: target_type.into(),
			target_where: None,
			where_nullable: true,
		}
	}

	pub fn with_where(mut self, where_type: impl Into<String>, nullable: bool) -> Self {
		self.target_where = Some(where_type.into());
		self.where_nullable = nullable;
		self
	}
}

pub(crate) type RelationLookup = fn(&CrudService) -> CrudResult<Arc<dyn CustomRelationResolver>>;

#[derive(Clone)]
pub struct CustomRelationConfig {
	pub relation: CustomRelation,
	pub is_many: bool,
	pub factory: &'static str,
	pub(crate) provider: Provider,
	pub(crate) lookup: RelationLookup,
}

pub(crate) fn relation_lookup<R: CustomRelationResolver>(
	service: &CrudService,
) -> CrudResult<Arc<dyn CustomRelationResolver>> {
	Ok(service.get_factory::<R>()? as Arc<dyn CustomRelationResolver>)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
	Query,
	Mutation,
	ResolveField,
}

/// Declared GraphQL surface of one custom operation.
///
/// # Examples
///
/// ```
/// use crudkit_core::{Action, Permission, TypeRef};
/// use crudkit_graphql::CustomOperation;
///
/// let op = CustomOperation::new("userStats", TypeRef::named("UserStats"))
///     .input("where", TypeRef::named("UserWhereInput"))
///     .nullable(true)
///     .method("stats")
///     .permission(Permission::new(Action::Read, "User"));
///
/// assert_eq!(op.output_type().to_string(), "UserStats");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CustomOperation {
	pub name: String,
	pub input: Option<ArgumentDef>,
	pub output: TypeRef,
	pub nullable: bool,
	pub method_name: String,
	pub permissions: Vec<Permission>,
}

impl CustomOperation {
	pub fn new(name: impl Into<String>, output: TypeRef) -> Self {
		let name = name.into();
		Self {
			method_name: name.clone(),
			name,
			input: None,
			output,
			nullable: false,
			permissions: Vec::new(),
		}
	}

	pub fn input(mut self, argument: impl Into<String>, ty: TypeRef) -> Self {
		self.input = Some(ArgumentDef::new(argument, ty));
		self
	}

	pub fn nullable(mut self, nullable: bool) -> Self {
		self.nullable = nullable;
		self
	}

	/// Name of the bound factory method, for diagnostics. Defaults to the operation name.
	pub fn method(mut self, method_name: impl Into<String>) -> Self {
		self.method_name = method_name.into();
		self
	}

	pub fn permission(mut self, permission: Permission) -> Self {
		self.permissions.push(permission);
		self
	}

	pub fn permissions<I>(mut self, permissions: I) -> Self
	where
		I: IntoIterator<Item = Permission>,
	{
		self.permissions.extend(permissions);
		self
	}

	/// Output type with the declared nullability applied.
	pub fn output_type(&self) -> TypeRef {
		if self.nullable {
			self.output.clone().nullable()
		} else {
			self.output.clone().non_null()
		}
	}
}

/// Arguments handed to a bound factory method, in binding order.
pub struct CustomCall {
	pub input: Value,
	pub ability: AbilityRef,
	pub parent: Option<Entity>,
	pub selection: Selection,
}

pub(crate) type InvokeFn =
	Arc<dyn Fn(Arc<CrudService>, CustomCall) -> BoxFuture<'static, CrudResult<Value>> + Send + Sync>;

#[derive(Clone)]
pub struct MethodBinding {
	pub kind: BindingKind,
	pub operation: CustomOperation,
	pub(crate) invoke: InvokeFn,
}

impl std::fmt::Debug for MethodBinding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MethodBinding")
			.field("kind", &self.kind)
			.field("operation", &self.operation)
			.finish()
	}
}

/// The entity's custom-resolver factory and its bound methods.
#[derive(Clone)]
pub struct CustomResolverConfig {
	pub factory: &'static str,
	pub(crate) type_id: TypeId,
	pub(crate) provider: Provider,
	pub bindings: Vec<MethodBinding>,
}

pub(crate) type SubscriptionLookup = fn(&InjectionContext) -> DiResult<Arc<dyn SubscriptionResolver>>;

/// Filter input and resolver used by the entity's subscription channel.
#[derive(Clone)]
pub struct SubscriptionConfig {
	pub filter: InputDef,
	pub resolver: &'static str,
	pub(crate) provider: Provider,
	pub(crate) lookup: SubscriptionLookup,
}

pub(crate) fn subscription_lookup<R: SubscriptionResolver>(
	ctx: &InjectionContext,
) -> DiResult<Arc<dyn SubscriptionResolver>> {
	Ok(ctx.resolve::<R>()? as Arc<dyn SubscriptionResolver>)
}
