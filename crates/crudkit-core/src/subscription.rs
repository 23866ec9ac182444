//! Change events and the Subscription-Resolution contract

use crate::entity::{self, ID_FIELD};
use crate::{CrudResult, Entity, Selection, SharedStorage};
use async_trait::async_trait;
use crudkit_di::{DiResult, Injectable, InjectionContext};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionAction {
	Create,
	Update,
	Delete,
	UpdateMany,
	DeleteMany,
}

impl SubscriptionAction {
	/// Whether the affected rows no longer exist once the event is published.
	pub fn is_removal(self) -> bool {
		matches!(self, Self::Delete | Self::DeleteMany)
	}
}

impl fmt::Display for SubscriptionAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tag = match self {
			Self::Create => "CREATE",
			Self::Update => "UPDATE",
			Self::Delete => "DELETE",
			Self::UpdateMany => "UPDATE_MANY",
			Self::DeleteMany => "DELETE_MANY",
		};
		f.write_str(tag)
	}
}

/// One mutation's worth of changed entities, published on the model channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionEvent {
	pub action: SubscriptionAction,
	pub model: String,
	pub entities: Vec<Entity>,
}

impl SubscriptionEvent {
	pub fn single(action: SubscriptionAction, model: impl Into<String>, entity: Entity) -> Self {
		Self::many(action, model, vec![entity])
	}

	pub fn many(action: SubscriptionAction, model: impl Into<String>, entities: Vec<Entity>) -> Self {
		Self {
			action,
			model: model.into(),
			entities,
		}
	}

	pub fn ids(&self) -> impl Iterator<Item = &Value> {
		self.entities.iter().filter_map(entity::id_of)
	}
}

/// Decides, per subscriber, whether an event is delivered and what it yields.
#[async_trait]
pub trait SubscriptionResolver: Send + Sync + 'static {
	async fn filter(&self, args: &Value, event: &SubscriptionEvent) -> CrudResult<bool>;

	async fn resolve(
		&self,
		args: &Value,
		event: &SubscriptionEvent,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>>;
}

/// Default resolver: filters by an explicit `ids` list and re-fetches the
/// matching rows without authorization.
///
/// An absent `ids` argument matches every event. Removal events cannot be
/// re-fetched, so the event's own snapshot is returned for them.
pub struct IdListSubscription {
	storage: SharedStorage,
}

impl IdListSubscription {
	pub fn new(storage: SharedStorage) -> Self {
		Self { storage }
	}

	fn requested_ids(args: &Value) -> Option<&Vec<Value>> {
		args.get("ids").and_then(Value::as_array)
	}

	fn matching_ids(args: &Value, event: &SubscriptionEvent) -> Vec<Value> {
		match Self::requested_ids(args) {
			Some(wanted) => event.ids().filter(|id| wanted.contains(id)).cloned().collect(),
			None => event.ids().cloned().collect(),
		}
	}
}

#[async_trait]
impl Injectable for IdListSubscription {
	async fn inject(ctx: &InjectionContext) -> DiResult<Self> {
		Ok(Self::new(ctx.resolve_cloned::<SharedStorage>()?))
	}
}

#[async_trait]
impl SubscriptionResolver for IdListSubscription {
	async fn filter(&self, args: &Value, event: &SubscriptionEvent) -> CrudResult<bool> {
		Ok(match Self::requested_ids(args) {
			Some(wanted) => event.ids().any(|id| wanted.contains(id)),
			None => true,
		})
	}

	async fn resolve(
		&self,
		args: &Value,
		event: &SubscriptionEvent,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let ids = Self::matching_ids(args, event);
		if event.action.is_removal() {
			return Ok(event
				.entities
				.iter()
				.filter(|e| entity::id_of(e).is_some_and(|id| ids.contains(id)))
				.map(|e| selection.project(e))
				.collect());
		}
		let mut filter = Map::new();
		filter.insert(ID_FIELD.to_string(), json!({ "in": ids }));
		self.storage
			.find_many_without_auth(&event.model, filter, selection)
			.await
	}
}
