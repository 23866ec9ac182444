//! Dynamic schema binding
//!
//! Turns the mounted resolver registries into an `async-graphql` dynamic
//! schema. Entity rows travel through the engine as `serde_json::Value`:
//! object-typed values are passed down as owned parents, scalars and enums
//! are converted to GraphQL values at the leaves.

use crate::app::Application;
use crate::context::{GraphQLContextExt, arguments, into_graphql_error, request_shape};
use crate::error::BootstrapError;
use crate::registry::{
	MUTATION_ROOT, OperationDescriptor, OperationHandler, OperationKind, QUERY_ROOT, ResolveFn,
	ResolveRequest, SUBSCRIPTION_ROOT, SubscribeFn, SubscribeRequest,
};
use crate::service::CrudService;
use async_graphql::dynamic::{
	self, Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, Schema,
	Subscription, SubscriptionField, SubscriptionFieldFuture,
};
use async_graphql::{Name, Value as ConstValue};
use crudkit_core::{FieldDef, TypeDef, TypeRef};
use futures_util::StreamExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeKind {
	Object,
	Input,
	Enum,
}

type TypeKinds = HashMap<String, TypeKind>;

fn to_dynamic(ty: &TypeRef) -> dynamic::TypeRef {
	match ty {
		TypeRef::Named(name) => dynamic::TypeRef::Named(name.clone()),
		TypeRef::NonNull(inner) => dynamic::TypeRef::NonNull(Box::new(to_dynamic(inner))),
		TypeRef::List(inner) => dynamic::TypeRef::List(Box::new(to_dynamic(inner))),
	}
}

/// Shapes a JSON value for the engine according to the declared output type.
fn to_field_value<'a>(
	value: Value,
	ty: &TypeRef,
	kinds: &TypeKinds,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
	match ty {
		TypeRef::NonNull(inner) => to_field_value(value, inner, kinds),
		_ if value.is_null() => Ok(None),
		TypeRef::List(inner) => match value {
			Value::Array(items) => {
				let mut values = Vec::with_capacity(items.len());
				for item in items {
					values.push(to_field_value(item, inner, kinds)?.unwrap_or(FieldValue::NULL));
				}
				Ok(Some(FieldValue::list(values)))
			}
			other => Err(async_graphql::Error::new(format!(
				"expected a list for {ty}, got {other}"
			))),
		},
		TypeRef::Named(name) => Ok(Some(match (kinds.get(&**name), value) {
			(Some(TypeKind::Object), value) => FieldValue::owned_any(value),
			(Some(TypeKind::Enum), Value::String(item)) => {
				FieldValue::value(ConstValue::Enum(Name::new(item)))
			}
			(_, value) => FieldValue::value(ConstValue::from_json(value)?),
		})),
	}
}

/// Field reading `name` off the parent row.
fn data_field(def: &FieldDef, kinds: &Arc<TypeKinds>) -> Field {
	let name = def.name.clone();
	let ty = def.ty.clone();
	let kinds = kinds.clone();
	let mut field = Field::new(def.name.clone(), to_dynamic(&def.ty), move |ctx| {
		let name = name.clone();
		let ty = ty.clone();
		let kinds = kinds.clone();
		FieldFuture::new(async move {
			let parent = ctx.parent_value.try_downcast_ref::<Value>()?;
			let value = parent.get(&name).cloned().unwrap_or(Value::Null);
			to_field_value(value, &ty, &kinds)
		})
	});
	if let Some(description) = &def.description {
		field = field.description(description.clone());
	}
	field
}

fn resolve_field(
	descriptor: &OperationDescriptor,
	resolve: ResolveFn,
	service: Arc<CrudService>,
	kinds: &Arc<TypeKinds>,
) -> Field {
	let permissions = Arc::new(descriptor.permissions.clone());
	let output = descriptor.output.clone();
	let attached = descriptor.kind == OperationKind::ResolveField;
	let kinds = kinds.clone();
	let mut field = Field::new(descriptor.name.clone(), to_dynamic(&descriptor.output), move |ctx| {
		let resolve = resolve.clone();
		let service = service.clone();
		let permissions = permissions.clone();
		let output = output.clone();
		let kinds = kinds.clone();
		FieldFuture::new(async move {
			let ability = ctx.ctx.ability()?;
			service
				.guard()
				.authorize(&ability, &permissions)
				.await
				.map_err(into_graphql_error)?;
			let parent = if attached {
				Some(ctx.parent_value.try_downcast_ref::<Value>()?.clone())
			} else {
				None
			};
			let request = ResolveRequest {
				args: arguments(&ctx.args)?,
				parent,
				ability,
				shape: request_shape(ctx.ctx.field()),
			};
			let value = resolve(service, request).await.map_err(into_graphql_error)?;
			to_field_value(value, &output, &kinds)
		})
	});
	for argument in &descriptor.arguments {
		field = field.argument(InputValue::new(argument.name.clone(), to_dynamic(&argument.ty)));
	}
	field
}

fn subscription_field(
	descriptor: &OperationDescriptor,
	subscribe: SubscribeFn,
	service: Arc<CrudService>,
	kinds: &Arc<TypeKinds>,
) -> SubscriptionField {
	let output = descriptor.output.clone();
	let kinds = kinds.clone();
	let mut field = SubscriptionField::new(
		descriptor.name.clone(),
		to_dynamic(&descriptor.output),
		move |ctx| {
			let subscribe = subscribe.clone();
			let service = service.clone();
			let output = output.clone();
			let kinds = kinds.clone();
			SubscriptionFieldFuture::new(async move {
				let request = SubscribeRequest {
					args: arguments(&ctx.args)?,
					shape: request_shape(ctx.ctx.field()),
				};
				let events = subscribe(service, request);
				Ok(events.map(move |item| {
					let value = item.map_err(into_graphql_error)?;
					Ok(to_field_value(value, &output, &kinds)?.unwrap_or(FieldValue::NULL))
				}))
			})
		},
	);
	for argument in &descriptor.arguments {
		field = field.argument(InputValue::new(argument.name.clone(), to_dynamic(&argument.ty)));
	}
	field
}

/// Builds the executable schema for every mounted entity.
///
/// Fails on a resolver field attached to an undeclared type and on two
/// operations claiming the same field of the same type.
pub fn build_schema(app: &Application) -> Result<Schema, BootstrapError> {
	let types = app.types();
	let kinds: Arc<TypeKinds> = Arc::new(
		types
			.iter()
			.map(|ty| {
				let kind = match ty {
					TypeDef::Object(_) => TypeKind::Object,
					TypeDef::Input(_) => TypeKind::Input,
					TypeDef::Enum(_) => TypeKind::Enum,
				};
				(ty.name().to_string(), kind)
			})
			.collect(),
	);

	let mut seen = HashSet::new();
	for entity in app.entities() {
		for op in entity.registry.operations() {
			if !seen.insert((op.owner.as_str(), op.name.as_str())) {
				return Err(BootstrapError::Schema(format!(
					"duplicate field {}.{} in {}",
					op.owner,
					op.name,
					entity.registry.label()
				)));
			}
		}
	}
	let claimed: HashSet<(&str, &str)> = app
		.entities()
		.iter()
		.flat_map(|entity| entity.registry.operations())
		.filter(|op| op.kind == OperationKind::ResolveField)
		.map(|op| (op.owner.as_str(), op.name.as_str()))
		.collect();

	let mut query = Object::new(QUERY_ROOT);
	let mut mutation = Object::new(MUTATION_ROOT);
	let mut subscription = Subscription::new(SUBSCRIPTION_ROOT);
	let (mut has_mutation, mut has_subscription) = (false, false);
	let mut attached: HashMap<&str, Vec<Field>> = HashMap::new();
	for entity in app.entities() {
		for op in entity.registry.operations() {
			let service = entity.service.clone();
			match (&op.handler, op.kind) {
				(OperationHandler::Subscribe(subscribe), _) => {
					subscription =
						subscription.field(subscription_field(op, subscribe.clone(), service, &kinds));
					has_subscription = true;
				}
				(OperationHandler::Resolve(resolve), OperationKind::Query) => {
					query = query.field(resolve_field(op, resolve.clone(), service, &kinds));
				}
				(OperationHandler::Resolve(resolve), OperationKind::Mutation) => {
					mutation = mutation.field(resolve_field(op, resolve.clone(), service, &kinds));
					has_mutation = true;
				}
				(OperationHandler::Resolve(resolve), _) => {
					if kinds.get(op.owner.as_str()) != Some(&TypeKind::Object) {
						return Err(BootstrapError::UnknownOwner {
							owner: op.owner.clone(),
							field: op.name.clone(),
						});
					}
					attached
						.entry(op.owner.as_str())
						.or_default()
						.push(resolve_field(op, resolve.clone(), service, &kinds));
				}
			}
		}
	}

	let settings = app.settings()?;
	let mut builder = Schema::build(
		QUERY_ROOT,
		has_mutation.then_some(MUTATION_ROOT),
		has_subscription.then_some(SUBSCRIPTION_ROOT),
	)
	.register(query);
	if has_mutation {
		builder = builder.register(mutation);
	}
	if has_subscription {
		builder = builder.register(subscription);
	}
	for ty in &types {
		match ty {
			TypeDef::Object(def) => {
				let mut object = Object::new(def.name.clone());
				if let Some(description) = &def.description {
					object = object.description(description.clone());
				}
				for field in &def.fields {
					if !claimed.contains(&(def.name.as_str(), field.name.as_str())) {
						object = object.field(data_field(field, &kinds));
					}
				}
				for field in attached.remove(def.name.as_str()).unwrap_or_default() {
					object = object.field(field);
				}
				builder = builder.register(object);
			}
			TypeDef::Input(def) => {
				let mut input = InputObject::new(def.name.clone());
				if let Some(description) = &def.description {
					input = input.description(description.clone());
				}
				for field in &def.fields {
					input = input.field(InputValue::new(field.name.clone(), to_dynamic(&field.ty)));
				}
				builder = builder.register(input);
			}
			TypeDef::Enum(def) => {
				let mut item = Enum::new(def.name.clone());
				for value in &def.values {
					item = item.item(value.as_str());
				}
				builder = builder.register(item);
			}
		}
	}
	builder = builder
		.data(app.container().clone())
		.limit_depth(settings.max_query_depth)
		.limit_complexity(settings.max_query_complexity);
	if !settings.introspection {
		builder = builder.disable_introspection();
	}
	let schema = builder
		.finish()
		.map_err(|e| BootstrapError::Schema(e.to_string()))?;
	tracing::info!(entities = app.entities().len(), "schema built");
	Ok(schema)
}
