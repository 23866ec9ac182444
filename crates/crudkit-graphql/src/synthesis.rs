//! Resolver synthesis chain
//!
//! [`crud_resolver`] produces the base registry (seven CRUD operations and
//! the subscription channel). Each relation configuration, then each custom
//! method binding, is folded over it in insertion order, every fold step
//! adding exactly one operation.

use crate::config::{
	BindingKind, CustomCall, CustomRelationConfig, EntityConfig, MethodBinding, OneToManyRelation,
	OneToOneRelation, RelationConfig,
};
use crate::filters::subscription_filter_name;
use crate::registry::{
	ArgumentDef, MUTATION_ROOT, OperationDescriptor, OperationHandler, OperationKind, QUERY_ROOT,
	ResolveRequest, ResolverRegistry, SUBSCRIPTION_ROOT, SubscribeRequest,
};
use crate::service::CrudService;
use convert_case::{Case, Casing};
use crudkit_core::entity;
use crudkit_core::types::PAGINATION_INPUT;
use crudkit_core::{
	Action, CrudError, CrudResult, Entity, FindManyArgs, Permission, RelationOutput, TypeRef,
};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

fn resolve_handler<F, Fut>(handler: F) -> OperationHandler
where
	F: Fn(Arc<CrudService>, ResolveRequest) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = CrudResult<Value>> + Send + 'static,
{
	OperationHandler::Resolve(Arc::new(
		move |service: Arc<CrudService>, request: ResolveRequest| -> BoxFuture<'static, CrudResult<Value>> {
			Box::pin(handler(service, request))
		},
	))
}

fn object_arg(request: &mut ResolveRequest, name: &str) -> CrudResult<Map<String, Value>> {
	match request.take_arg(name) {
		Value::Null => Ok(Map::new()),
		Value::Object(map) => Ok(map),
		other => Err(CrudError::invalid_argument(
			name,
			format!("expected an object, got {other}"),
		)),
	}
}

fn id_arg(request: &mut ResolveRequest) -> CrudResult<String> {
	match request.take_arg(entity::ID_FIELD) {
		Value::String(id) => Ok(id),
		Value::Number(id) => Ok(id.to_string()),
		other => Err(CrudError::invalid_argument(
			entity::ID_FIELD,
			format!("expected an id, got {other}"),
		)),
	}
}

fn parent_of(request: &ResolveRequest, field: &str) -> CrudResult<Entity> {
	request
		.parent
		.clone()
		.ok_or_else(|| CrudError::invalid_argument(field, "field resolver called without a parent"))
}

/// Collects the non-null `where`/`pagination` arguments of a relation field
/// into one `{where, pagination}` object.
fn relation_args(request: &mut ResolveRequest) -> Option<Value> {
	let mut filter = Map::new();
	for key in ["where", "pagination"] {
		let value = request.take_arg(key);
		if !value.is_null() {
			filter.insert(key.to_string(), value);
		}
	}
	(!filter.is_empty()).then_some(Value::Object(filter))
}

fn relation_filter(request: &mut ResolveRequest) -> CrudResult<Option<FindManyArgs>> {
	relation_args(request)
		.map(FindManyArgs::from_value)
		.transpose()
}

fn relation_arguments(target_where: Option<&str>, where_nullable: bool) -> Vec<ArgumentDef> {
	let Some(where_type) = target_where else {
		return Vec::new();
	};
	let where_ty = TypeRef::named(where_type.to_string());
	vec![
		ArgumentDef::new(
			"where",
			if where_nullable { where_ty } else { where_ty.non_null() },
		),
		ArgumentDef::new("pagination", TypeRef::named(PAGINATION_INPUT)),
	]
}

fn relation_method(field: &str) -> String {
	format!("resolve{}", field.to_case(Case::Pascal))
}

/// Base registry: `{m}FindOne`, `{m}FindMany`, `{m}Create`, `{m}Update`,
/// `{m}UpdateMany`, `{m}Delete`, `{m}DeleteMany` and the `{m}s` channel.
pub fn crud_resolver(config: &EntityConfig) -> ResolverRegistry {
	let model = &config.model_name;
	let entity_type = config.entity_type().to_string();
	let single = TypeRef::named_nn(entity_type.clone());
	let list = TypeRef::named_nn_list_nn(entity_type.clone());
	let where_input = TypeRef::named_nn(config.where_input.name.clone());
	let permission = |action| vec![Permission::new(action, entity_type.clone())];
	let mut registry = ResolverRegistry::new(model.clone(), entity_type.clone());

	let read_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Query,
		owner: QUERY_ROOT.to_string(),
		name: format!("{model}FindOne"),
		method_name: "findOne".to_string(),
		arguments: vec![ArgumentDef::new("where", where_input.clone())],
		output: TypeRef::named(entity_type.clone()),
		permissions: permission(Action::Read),
		handler: resolve_handler(move |service, mut request| {
			let read_type = read_type.clone();
			async move {
				let filter = object_arg(&mut request, "where")?;
				let selection = service.selection_for(&read_type, &request.shape);
				let found = service.find_one(&request.ability, filter, &selection).await?;
				Ok(found.unwrap_or(Value::Null))
			}
		}),
	});

	let read_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Query,
		owner: QUERY_ROOT.to_string(),
		name: format!("{model}FindMany"),
		method_name: "findMany".to_string(),
		arguments: vec![ArgumentDef::new(
			"filter",
			TypeRef::named(config.find_many_args_type()),
		)],
		output: list.clone(),
		permissions: permission(Action::Read),
		handler: resolve_handler(move |service, mut request| {
			let read_type = read_type.clone();
			async move {
				let args = FindManyArgs::from_value(request.take_arg("filter"))?;
				let selection = service.selection_for(&read_type, &request.shape);
				let rows = service.find_many(&request.ability, args, &selection).await?;
				Ok(Value::Array(rows))
			}
		}),
	});

	let write_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Mutation,
		owner: MUTATION_ROOT.to_string(),
		name: format!("{model}Create"),
		method_name: "create".to_string(),
		arguments: vec![ArgumentDef::new(
			"data",
			TypeRef::named_nn(config.create_input.name.clone()),
		)],
		output: single.clone(),
		permissions: permission(Action::Create),
		handler: resolve_handler(move |service, mut request| {
			let write_type = write_type.clone();
			async move {
				let data = request.take_arg("data");
				let selection = service.selection_for(&write_type, &request.shape);
				service.create(data, &selection).await
			}
		}),
	});

	let write_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Mutation,
		owner: MUTATION_ROOT.to_string(),
		name: format!("{model}Update"),
		method_name: "update".to_string(),
		arguments: vec![
			ArgumentDef::new("data", TypeRef::named_nn(config.update_input.name.clone())),
			ArgumentDef::new(entity::ID_FIELD, TypeRef::named_nn(TypeRef::ID)),
		],
		output: single.clone(),
		permissions: permission(Action::Update),
		handler: resolve_handler(move |service, mut request| {
			let write_type = write_type.clone();
			async move {
				let data = request.take_arg("data");
				let id = id_arg(&mut request)?;
				let selection = service.selection_for(&write_type, &request.shape);
				service.update(&request.ability, data, &id, &selection).await
			}
		}),
	});

	let write_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Mutation,
		owner: MUTATION_ROOT.to_string(),
		name: format!("{model}UpdateMany"),
		method_name: "updateMany".to_string(),
		arguments: vec![
			ArgumentDef::new(
				"data",
				TypeRef::named_nn(config.update_many_input.name.clone()),
			),
			ArgumentDef::new("where", where_input.clone()),
		],
		output: list.clone(),
		permissions: permission(Action::Update),
		handler: resolve_handler(move |service, mut request| {
			let write_type = write_type.clone();
			async move {
				let data = request.take_arg("data");
				let filter = object_arg(&mut request, "where")?;
				let selection = service.selection_for(&write_type, &request.shape);
				let rows = service
					.update_many(&request.ability, data, filter, &selection)
					.await?;
				Ok(Value::Array(rows))
			}
		}),
	});

	let write_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Mutation,
		owner: MUTATION_ROOT.to_string(),
		name: format!("{model}Delete"),
		method_name: "delete".to_string(),
		arguments: vec![ArgumentDef::new(
			entity::ID_FIELD,
			TypeRef::named_nn(TypeRef::ID),
		)],
		output: single,
		permissions: permission(Action::Delete),
		handler: resolve_handler(move |service, mut request| {
			let write_type = write_type.clone();
			async move {
				let id = id_arg(&mut request)?;
				let selection = service.selection_for(&write_type, &request.shape);
				service.delete(&request.ability, &id, &selection).await
			}
		}),
	});

	let write_type = entity_type.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::Mutation,
		owner: MUTATION_ROOT.to_string(),
		name: format!("{model}DeleteMany"),
		method_name: "deleteMany".to_string(),
		arguments: vec![ArgumentDef::new("where", where_input)],
		output: list.clone(),
		permissions: permission(Action::Delete),
		handler: resolve_handler(move |service, mut request| {
			let write_type = write_type.clone();
			async move {
				let filter = object_arg(&mut request, "where")?;
				let selection = service.selection_for(&write_type, &request.shape);
				let rows = service
					.delete_many(&request.ability, filter, &selection)
					.await?;
				Ok(Value::Array(rows))
			}
		}),
	});

	let filter_type = match &config.subscription {
		Some(custom) => custom.filter.name.clone(),
		None => subscription_filter_name(model),
	};
	registry.register(OperationDescriptor {
		kind: OperationKind::Subscription,
		owner: SUBSCRIPTION_ROOT.to_string(),
		name: format!("{model}s"),
		method_name: "subscribe".to_string(),
		arguments: vec![ArgumentDef::new("filter", TypeRef::named(filter_type))],
		output: list,
		permissions: Vec::new(),
		handler: OperationHandler::Subscribe(Arc::new(|service: Arc<CrudService>, mut request: SubscribeRequest| {
			let filter = request.args.remove("filter").unwrap_or(Value::Null);
			service.subscribe(filter, &request.shape)
		})),
	});

	registry
}

/// Adds `parent.{field}` listing the target rows keyed by the parent's id.
pub fn one_to_many_extension(
	parent: ResolverRegistry,
	relation: &OneToManyRelation,
) -> ResolverRegistry {
	let mut registry = parent.extend(relation.field.clone());
	let owner = registry.entity_type().to_string();
	let rel = relation.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::ResolveField,
		owner,
		name: relation.field.clone(),
		method_name: relation_method(&relation.field),
		arguments: relation_arguments(relation.target_where.as_deref(), relation.where_nullable),
		output: TypeRef::named_nn_list_nn(relation.target_type.clone()),
		permissions: Vec::new(),
		handler: resolve_handler(move |service, mut request| {
			let rel = rel.clone();
			async move {
				let parent = parent_of(&request, &rel.field)?;
				let Some(parent_id) = entity::id_of(&parent).cloned() else {
					return Ok(Value::Array(Vec::new()));
				};
				let filter = if rel.target_where.is_some() {
					relation_filter(&mut request)?
				} else {
					None
				};
				let selection = service.selection_for(&rel.target_type, &request.shape);
				let rows = service
					.resolve_one_to_many(
						&request.ability,
						&rel.target_model,
						&rel.foreign_key,
						parent_id,
						&selection,
						filter,
					)
					.await?;
				Ok(Value::Array(rows))
			}
		}),
	});
	registry
}

/// Adds `parent.{field}` fetching the target row named by the parent's foreign key.
pub fn one_to_one_extension(
	parent: ResolverRegistry,
	relation: &OneToOneRelation,
) -> ResolverRegistry {
	let mut registry = parent.extend(relation.field.clone());
	let owner = registry.entity_type().to_string();
	let target = TypeRef::named(relation.target_type.clone());
	let rel = relation.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::ResolveField,
		owner,
		name: relation.field.clone(),
		method_name: relation_method(&relation.field),
		arguments: Vec::new(),
		output: if relation.nullable { target } else { target.non_null() },
		permissions: Vec::new(),
		handler: resolve_handler(move |service, request| {
			let rel = rel.clone();
			async move {
				let parent = parent_of(&request, &rel.field)?;
				let selection = service.selection_for(&rel.target_type, &request.shape);
				let found = service
					.resolve_one_to_one(
						&request.ability,
						&rel.target_model,
						parent.get(&rel.foreign_key),
						&selection,
					)
					.await?;
				Ok(found.unwrap_or(Value::Null))
			}
		}),
	});
	registry
}

/// Adds `parent.{field}` delegating to the relation's resolver factory.
pub fn custom_relation_extension(
	parent: ResolverRegistry,
	relation: &CustomRelationConfig,
) -> ResolverRegistry {
	let mut registry = parent.extend(relation.relation.field.clone());
	let owner = registry.entity_type().to_string();
	let output = if relation.is_many {
		TypeRef::named_nn_list_nn(relation.relation.target_type.clone())
	} else {
		TypeRef::named(relation.relation.target_type.clone())
	};
	let rel = relation.clone();
	registry.register(OperationDescriptor {
		kind: OperationKind::ResolveField,
		owner,
		name: relation.relation.field.clone(),
		method_name: relation_method(&relation.relation.field),
		arguments: relation_arguments(
			relation.relation.target_where.as_deref(),
			relation.relation.where_nullable,
		),
		output,
		permissions: Vec::new(),
		handler: resolve_handler(move |service, mut request| {
			let rel = rel.clone();
			async move {
				let field = rel.relation.field.as_str();
				let parent = parent_of(&request, field)?;
				let resolver = (rel.lookup)(&service)?;
				let selection = service.selection_for(&rel.relation.target_type, &request.shape);
				let args = relation_args(&mut request);
				let output = resolver
					.resolve(&request.ability, &parent, &selection, args)
					.await?;
				match (rel.is_many, output) {
					(true, RelationOutput::One(found)) => {
						Ok(Value::Array(found.into_iter().collect()))
					}
					(false, RelationOutput::Many(_)) => Err(CrudError::invalid_argument(
						field,
						"custom relation returned a list for a single-valued field",
					)),
					(_, output) => Ok(output.into_value()),
				}
			}
		}),
	});
	registry
}

/// Adds one query, mutation or entity field bound to a custom-resolver method.
pub fn custom_binding_extension(
	parent: ResolverRegistry,
	binding: &MethodBinding,
) -> ResolverRegistry {
	let operation = &binding.operation;
	let mut registry = parent.extend(operation.name.clone());
	let (kind, owner) = match binding.kind {
		BindingKind::Query => (OperationKind::Query, QUERY_ROOT.to_string()),
		BindingKind::Mutation => (OperationKind::Mutation, MUTATION_ROOT.to_string()),
		BindingKind::ResolveField => (
			OperationKind::ResolveField,
			registry.entity_type().to_string(),
		),
	};
	let output = operation.output_type();
	let output_type = output.type_name().to_string();
	let input_name = operation.input.as_ref().map(|arg| arg.name.clone());
	let invoke = binding.invoke.clone();
	registry.register(OperationDescriptor {
		kind,
		owner,
		name: operation.name.clone(),
		method_name: operation.method_name.clone(),
		arguments: operation.input.iter().cloned().collect(),
		output,
		permissions: operation.permissions.clone(),
		handler: resolve_handler(move |service, mut request| {
			let invoke = invoke.clone();
			let output_type = output_type.clone();
			let input_name = input_name.clone();
			async move {
				let input = match &input_name {
					Some(name) => request.take_arg(name),
					None => Value::Null,
				};
				let selection = service.selection_for(&output_type, &request.shape);
				let call = CustomCall {
					input,
					ability: request.ability,
					parent: request.parent,
					selection,
				};
				invoke(service, call).await
			}
		}),
	});
	registry
}

/// Builds the entity's full registry: base operations, then relations, then
/// custom bindings, each group in insertion order.
pub fn synthesize(config: &EntityConfig) -> ResolverRegistry {
	let with_relations = config
		.relations
		.iter()
		.fold(crud_resolver(config), |registry, relation| match relation {
			RelationConfig::OneToMany(rel) => one_to_many_extension(registry, rel),
			RelationConfig::OneToOne(rel) => one_to_one_extension(registry, rel),
			RelationConfig::Custom(rel) => custom_relation_extension(registry, rel),
		});
	let registry = config
		.custom_resolver
		.iter()
		.flat_map(|custom| custom.bindings.iter())
		.fold(with_relations, custom_binding_extension);
	tracing::debug!(
		resolver = %registry.label(),
		model = %registry.model(),
		operations = registry.len(),
		"resolver synthesized"
	);
	registry
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::CrudBuilder;
	use crate::config::{CustomOperation, OneToManyRelation, OneToOneRelation};
	use crate::pubsub::ChannelRegistry;
	use crate::rules::SelectionRules;
	use async_trait::async_trait;
	use crudkit_core::{
		AbilityGuard, AbilityRef, AllowAll, CrudSettings, IdListSubscription, InputDef, ObjectDef,
		ProjectionSelection, RequestShape, Selection, SharedGuard, SharedSelection, SharedStorage,
	};
	use crudkit_db::RecordingStorage;
	use crudkit_di::{DiResult, Injectable, InjectionContext, SingletonScope};
	use rstest::rstest;
	use serde_json::json;

	struct Stats;

	#[async_trait]
	impl Injectable for Stats {
		async fn inject(_ctx: &InjectionContext) -> DiResult<Self> {
			Ok(Stats)
		}
	}

	async fn greet(_stats: Arc<Stats>, input: String, _ability: AbilityRef, _selection: Selection) -> CrudResult<String> {
		Ok(format!("hello {input}"))
	}

	async fn initials(
		_stats: Arc<Stats>,
		_input: Value,
		_ability: AbilityRef,
		parent: Entity,
		_selection: Selection,
	) -> CrudResult<String> {
		let name = parent["name"].as_str().unwrap_or_default();
		Ok(name.chars().take(1).collect())
	}

	fn base() -> crate::EntityConfigBuilder {
		CrudBuilder::new(
			ObjectDef::new("User")
				.field("id", TypeRef::named_nn(TypeRef::ID))
				.field("name", TypeRef::named_nn(TypeRef::STRING)),
		)
		.with_config(
			"user",
			InputDef::new("UserCreateInput"),
			InputDef::new("UserUpdateInput"),
			InputDef::new("UserUpdateManyInput"),
			InputDef::new("UserWhereInput"),
		)
	}

	fn posts() -> OneToManyRelation {
		OneToManyRelation::new("posts", "post", "Post", "authorId").with_where("PostWhereInput", true)
	}

	fn profile() -> OneToOneRelation {
		OneToOneRelation::new("profile", "profile", "Profile", "profileId")
	}

	fn user_config() -> EntityConfig {
		base()
			.add_relation(posts())
			.add_one_to_one_relation(profile())
			.with_custom_resolver::<Stats>()
			.add_query(
				CustomOperation::new("userGreeting", TypeRef::named(TypeRef::STRING))
					.input("name", TypeRef::named_nn(TypeRef::STRING)),
				greet,
			)
			.add_resolve_field(
				CustomOperation::new("initials", TypeRef::named(TypeRef::STRING)),
				initials,
			)
			.build()
	}

	async fn service_for(config: &EntityConfig) -> (Arc<CrudService>, Arc<RecordingStorage>) {
		let storage = Arc::new(RecordingStorage::memory());
		let scope = Arc::new(SingletonScope::new());
		scope.set(storage.clone() as SharedStorage);
		scope.set(Arc::new(ProjectionSelection) as SharedSelection);
		scope.set(Arc::new(AbilityGuard) as SharedGuard);
		scope.set(SelectionRules::from_configs([config]));
		scope.set(ChannelRegistry::new(8));
		scope.set(CrudSettings::default());
		scope.set(IdListSubscription::new(storage.clone() as SharedStorage));
		scope.set(Stats);
		let container = Arc::new(InjectionContext::builder(scope).name("UserCrudModule").build());
		let service = CrudService::from_container(config, container).unwrap();
		(Arc::new(service), storage)
	}

	async fn call(
		registry: &ResolverRegistry,
		service: Arc<CrudService>,
		kind: OperationKind,
		name: &str,
		args: Value,
		parent: Option<Entity>,
	) -> CrudResult<Value> {
		let descriptor = registry.find(kind, name).unwrap();
		let OperationHandler::Resolve(handler) = &descriptor.handler else {
			panic!("Expected a resolve handler");
		};
		let Value::Object(args) = args else {
			panic!("Expected object arguments");
		};
		let request = ResolveRequest {
			args,
			parent,
			ability: Arc::new(AllowAll),
			shape: RequestShape::node(name, vec![RequestShape::leaf("id"), RequestShape::leaf("name")]),
		};
		handler(service, request).await
	}

	#[rstest]
	fn test_base_resolver_exposes_crud_and_channel() {
		let registry = crud_resolver(&base().build());

		assert_eq!(
			registry.operation_names(),
			[
				"userFindOne",
				"userFindMany",
				"userCreate",
				"userUpdate",
				"userUpdateMany",
				"userDelete",
				"userDeleteMany",
				"users"
			]
		);
		assert_eq!(registry.label(), "UserResolver");
	}

	#[rstest]
	fn test_base_permissions_use_entity_type() {
		let registry = crud_resolver(&base().build());

		let delete = registry.find(OperationKind::Mutation, "userDelete").unwrap();
		assert_eq!(delete.permissions, [Permission::new(Action::Delete, "User")]);
		let channel = registry.find(OperationKind::Subscription, "users").unwrap();
		assert!(channel.permissions.is_empty());
		assert_eq!(channel.arguments[0].ty.to_string(), "UserSubscriptionFilter");
	}

	#[rstest]
	fn test_fold_order_is_relations_then_bindings() {
		let registry = synthesize(&user_config());

		assert_eq!(registry.label(), "UserResolver+posts+profile+userGreeting+initials");
		assert_eq!(registry.len(), 8 + 2 + 2);
		let posts = registry.find(OperationKind::ResolveField, "posts").unwrap();
		assert_eq!(posts.owner, "User");
		assert_eq!(posts.method_name, "resolvePosts");
		assert_eq!(posts.output.to_string(), "[Post!]!");
		let arguments: Vec<String> = posts.arguments.iter().map(|a| a.ty.to_string()).collect();
		assert_eq!(arguments, ["PostWhereInput", "PaginationInput"]);
	}

	#[rstest]
	fn test_relation_without_where_type_takes_no_arguments() {
		let registry = synthesize(
			&base()
				.add_relation(OneToManyRelation::new("posts", "post", "Post", "authorId"))
				.build(),
		);

		let posts = registry.find(OperationKind::ResolveField, "posts").unwrap();
		assert!(posts.arguments.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_find_many_handler_normalizes_filter() {
		// Arrange
		let config = base().build();
		let registry = synthesize(&config);
		let (service, storage) = service_for(&config).await;

		// Act
		call(
			&registry,
			service,
			OperationKind::Query,
			"userFindMany",
			json!({"filter": {"where": {"name": {"contains": "jo"}}, "take": 10, "skip": 0}}),
			None,
		)
		.await
		.unwrap();

		// Assert
		assert_eq!(
			storage.calls_to("find_many")[0].arguments,
			json!({
				"where": {"name": {"contains": "jo"}},
				"pagination": {"take": 10, "skip": 0}
			})
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_one_to_many_without_parent_id_returns_empty() {
		let config = user_config();
		let registry = synthesize(&config);
		let (service, storage) = service_for(&config).await;

		let posts = call(
			&registry,
			service,
			OperationKind::ResolveField,
			"posts",
			json!({}),
			Some(json!({"name": "Ann"})),
		)
		.await
		.unwrap();

		assert_eq!(posts, json!([]));
		assert_eq!(storage.call_count(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_custom_query_receives_input() {
		let config = user_config();
		let registry = synthesize(&config);
		let (service, _) = service_for(&config).await;

		let greeting = call(
			&registry,
			service,
			OperationKind::Query,
			"userGreeting",
			json!({"name": "Ann"}),
			None,
		)
		.await
		.unwrap();

		assert_eq!(greeting, json!("hello Ann"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_custom_field_receives_parent() {
		let config = user_config();
		let registry = synthesize(&config);
		let (service, _) = service_for(&config).await;

		let value = call(
			&registry,
			service,
			OperationKind::ResolveField,
			"initials",
			json!({}),
			Some(json!({"id": "u1", "name": "Ann"})),
		)
		.await
		.unwrap();

		assert_eq!(value, json!("A"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_undecodable_custom_input_is_bad_user_input() {
		let config = user_config();
		let registry = synthesize(&config);
		let (service, _) = service_for(&config).await;

		let err = call(
			&registry,
			service,
			OperationKind::Query,
			"userGreeting",
			json!({"name": 42}),
			None,
		)
		.await
		.unwrap_err();

		assert_eq!(err.code(), "BAD_USER_INPUT");
	}
}
