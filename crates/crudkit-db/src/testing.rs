//! Storage double that records every call before delegating
//!
//! Used to assert how often, and with which normalized arguments, the
//! storage collaborator was reached.

use crate::MemoryStorage;
use async_trait::async_trait;
use crudkit_core::{
	AbilityRef, CrudResult, Entity, FindManyQuery, Selection, SharedStorage, StorageAccess,
};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub struct StorageCall {
	pub operation: &'static str,
	pub model: String,
	pub arguments: Value,
	pub selection: Value,
}

pub struct RecordingStorage {
	inner: SharedStorage,
	calls: Mutex<Vec<StorageCall>>,
}

impl RecordingStorage {
	pub fn new(inner: SharedStorage) -> Self {
		Self {
			inner,
			calls: Mutex::new(Vec::new()),
		}
	}

	/// Wraps an empty [`MemoryStorage`].
	pub fn memory() -> Self {
		Self::new(Arc::new(MemoryStorage::new()))
	}

	pub fn inner(&self) -> &SharedStorage {
		&self.inner
	}

	pub fn calls(&self) -> Vec<StorageCall> {
		self.calls
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn calls_to(&self, operation: &str) -> Vec<StorageCall> {
		self.calls()
			.into_iter()
			.filter(|call| call.operation == operation)
			.collect()
	}

	pub fn clear(&self) {
		self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
	}

	fn record(&self, operation: &'static str, model: &str, arguments: Value, selection: &Selection) {
		tracing::trace!(operation, model, "storage call recorded");
		self.calls
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(StorageCall {
				operation,
				model: model.to_string(),
				arguments,
				selection: selection.to_json(),
			});
	}
}

#[async_trait]
impl StorageAccess for RecordingStorage {
	async fn find_one(
		&self,
		model: &str,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Option<Entity>> {
		self.record("find_one", model, json!({ "where": filter }), selection);
		self.inner.find_one(model, ability, filter, selection).await
	}

	async fn find_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		query: FindManyQuery,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		self.record("find_many", model, serde_json::to_value(&query)?, selection);
		self.inner.find_many(model, ability, query, selection).await
	}

	async fn create(&self, model: &str, data: Value, selection: &Selection) -> CrudResult<Entity> {
		self.record("create", model, json!({ "data": data }), selection);
		self.inner.create(model, data, selection).await
	}

	async fn update(
		&self,
		model: &str,
		ability: &AbilityRef,
		data: Value,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity> {
		self.record("update", model, json!({ "data": data, "id": id }), selection);
		self.inner.update(model, ability, data, id, selection).await
	}

	async fn update_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		data: Value,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		self.record("update_many", model, json!({ "data": data, "where": filter }), selection);
		self.inner.update_many(model, ability, data, filter, selection).await
	}

	async fn delete(
		&self,
		model: &str,
		ability: &AbilityRef,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity> {
		self.record("delete", model, json!({ "id": id }), selection);
		self.inner.delete(model, ability, id, selection).await
	}

	async fn delete_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		self.record("delete_many", model, json!({ "where": filter }), selection);
		self.inner.delete_many(model, ability, filter, selection).await
	}

	async fn find_many_without_auth(
		&self,
		model: &str,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		self.record("find_many_without_auth", model, json!({ "where": filter }), selection);
		self.inner.find_many_without_auth(model, filter, selection).await
	}
}
