//! Resolver registry
//!
//! Each entity gets one [`ResolverRegistry`]: an ordered list of
//! [`OperationDescriptor`]s that the schema binding turns into GraphQL
//! fields. Synthesis steps extend the registry one operation at a time and
//! record themselves in its lineage, which doubles as the diagnostic label
//! (`UserResolver+posts+author`).

use crate::service::CrudService;
use crudkit_core::{AbilityRef, CrudResult, Entity, Permission, RequestShape, TypeRef};
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
	Query,
	Mutation,
	Subscription,
	ResolveField,
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self {
			Self::Query => "query",
			Self::Mutation => "mutation",
			Self::Subscription => "subscription",
			Self::ResolveField => "resolve_field",
		};
		f.write_str(kind)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDef {
	pub name: String,
	pub ty: TypeRef,
}

impl ArgumentDef {
	pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
		Self {
			name: name.into(),
			ty,
		}
	}
}

/// Inputs of one resolver invocation.
pub struct ResolveRequest {
	pub args: Map<String, Value>,
	/// The object a field resolver is attached to.
	pub parent: Option<Entity>,
	pub ability: AbilityRef,
	pub shape: RequestShape,
}

impl ResolveRequest {
	pub fn arg(&self, name: &str) -> Option<&Value> {
		self.args.get(name).filter(|v| !v.is_null())
	}

	pub fn take_arg(&mut self, name: &str) -> Value {
		self.args.remove(name).unwrap_or(Value::Null)
	}
}

pub struct SubscribeRequest {
	pub args: Map<String, Value>,
	pub shape: RequestShape,
}

pub type ResolveFn =
	Arc<dyn Fn(Arc<CrudService>, ResolveRequest) -> BoxFuture<'static, CrudResult<Value>> + Send + Sync>;
pub type SubscribeFn =
	Arc<dyn Fn(Arc<CrudService>, SubscribeRequest) -> BoxStream<'static, CrudResult<Value>> + Send + Sync>;

#[derive(Clone)]
pub enum OperationHandler {
	Resolve(ResolveFn),
	Subscribe(SubscribeFn),
}

/// One exposed operation: where it attaches, how it is called and who may call it.
#[derive(Clone)]
pub struct OperationDescriptor {
	pub kind: OperationKind,
	/// Type the field is attached to: `Query`, `Mutation`, `Subscription` or an entity type.
	pub owner: String,
	pub name: String,
	pub method_name: String,
	pub arguments: Vec<ArgumentDef>,
	pub output: TypeRef,
	pub permissions: Vec<Permission>,
	pub handler: OperationHandler,
}

impl fmt::Debug for OperationDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OperationDescriptor")
			.field("kind", &self.kind)
			.field("owner", &self.owner)
			.field("name", &self.name)
			.field("method_name", &self.method_name)
			.field("output", &self.output.to_string())
			.finish()
	}
}

pub const QUERY_ROOT: &str = "Query";
pub const MUTATION_ROOT: &str = "Mutation";
pub const SUBSCRIPTION_ROOT: &str = "Subscription";

/// Ordered operation set of one entity's synthesized resolver.
#[derive(Clone, Debug)]
pub struct ResolverRegistry {
	model: String,
	entity_type: String,
	lineage: Vec<String>,
	operations: Vec<OperationDescriptor>,
}

impl ResolverRegistry {
	pub fn new(model: impl Into<String>, entity_type: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			entity_type: entity_type.into(),
			lineage: Vec::new(),
			operations: Vec::new(),
		}
	}

	pub fn model(&self) -> &str {
		&self.model
	}

	pub fn entity_type(&self) -> &str {
		&self.entity_type
	}

	/// Diagnostic label, e.g. `UserResolver+posts+stats`.
	pub fn label(&self) -> String {
		let mut label = format!("{}Resolver", self.entity_type);
		for step in &self.lineage {
			label.push('+');
			label.push_str(step);
		}
		label
	}

	pub(crate) fn extend(mut self, step: impl Into<String>) -> Self {
		self.lineage.push(step.into());
		self
	}

	/// Appends an operation; duplicate names are reported, not rejected.
	pub(crate) fn register(&mut self, descriptor: OperationDescriptor) {
		if self
			.operations
			.iter()
			.any(|op| op.owner == descriptor.owner && op.name == descriptor.name)
		{
			tracing::warn!(
				resolver = %self.label(),
				owner = %descriptor.owner,
				operation = %descriptor.name,
				"duplicate operation name"
			);
		}
		tracing::debug!(
			resolver = %self.label(),
			kind = %descriptor.kind,
			operation = %descriptor.name,
			method = %descriptor.method_name,
			"operation registered"
		);
		self.operations.push(descriptor);
	}

	pub fn operations(&self) -> &[OperationDescriptor] {
		&self.operations
	}

	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	pub fn find(&self, kind: OperationKind, name: &str) -> Option<&OperationDescriptor> {
		self.operations
			.iter()
			.find(|op| op.kind == kind && op.name == name)
	}

	pub fn operation_names(&self) -> Vec<&str> {
		self.operations.iter().map(|op| op.name.as_str()).collect()
	}
}
