//! Custom-Relation-Resolution contract

use crate::{AbilityRef, CrudResult, Entity, Selection};
use async_trait::async_trait;
use serde_json::Value;

/// Result of a custom relation: a single (possibly absent) entity or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationOutput {
	One(Option<Entity>),
	Many(Vec<Entity>),
}

impl RelationOutput {
	pub fn into_value(self) -> Value {
		match self {
			Self::One(entity) => entity.unwrap_or(Value::Null),
			Self::Many(entities) => Value::Array(entities),
		}
	}
}

/// Hand-written resolution for a relation field.
///
/// Implementations are registered as providers of the entity's module and
/// looked up by type at call time.
#[async_trait]
pub trait CustomRelationResolver: Send + Sync + 'static {
	async fn resolve(
		&self,
		ability: &AbilityRef,
		parent: &Entity,
		selection: &Selection,
		args: Option<Value>,
	) -> CrudResult<RelationOutput>;
}
