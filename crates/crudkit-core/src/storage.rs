//! Storage Access contract
//!
//! Implemented by the ORM/database adapter. Every call is scoped to a model
//! name; calls taking an [`AbilityRef`] must restrict themselves to the rows
//! the ability's conditions allow.

use crate::query::FindManyQuery;
use crate::{AbilityRef, CrudResult, Entity, Selection};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

#[async_trait]
pub trait StorageAccess: Send + Sync + 'static {
	async fn find_one(
		&self,
		model: &str,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Option<Entity>>;

	async fn find_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		query: FindManyQuery,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>>;

	async fn create(&self, model: &str, data: Value, selection: &Selection) -> CrudResult<Entity>;

	async fn update(
		&self,
		model: &str,
		ability: &AbilityRef,
		data: Value,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity>;

	async fn update_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		data: Value,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>>;

	async fn delete(
		&self,
		model: &str,
		ability: &AbilityRef,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity>;

	async fn delete_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>>;

	/// Unscoped read used by the default subscription resolver.
	async fn find_many_without_auth(
		&self,
		model: &str,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>>;
}

pub type SharedStorage = Arc<dyn StorageAccess>;
