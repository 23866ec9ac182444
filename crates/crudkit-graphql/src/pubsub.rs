//! Per-model subscription channels
//!
//! Each model gets one broadcast channel, created on first use. Publishing
//! never waits for subscribers: an event with no listeners is dropped, and a
//! subscriber that falls behind loses the oldest events.

use crudkit_core::SubscriptionEvent;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct ChannelRegistry {
	capacity: usize,
	channels: DashMap<String, broadcast::Sender<Arc<SubscriptionEvent>>>,
}

impl ChannelRegistry {
	/// # Examples
	///
	/// ```
	/// use crudkit_core::{SubscriptionAction, SubscriptionEvent};
	/// use crudkit_graphql::ChannelRegistry;
	/// use serde_json::json;
	///
	/// let channels = ChannelRegistry::new(16);
	/// let mut rx = channels.subscribe("user");
	///
	/// let event = SubscriptionEvent::single(SubscriptionAction::Create, "user", json!({"id": "u1"}));
	/// assert_eq!(channels.publish(event), 1);
	/// assert_eq!(rx.try_recv().unwrap().action, SubscriptionAction::Create);
	/// ```
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity: capacity.max(1),
			channels: DashMap::new(),
		}
	}

	fn sender(&self, model: &str) -> broadcast::Sender<Arc<SubscriptionEvent>> {
		self.channels
			.entry(model.to_string())
			.or_insert_with(|| broadcast::channel(self.capacity).0)
			.clone()
	}

	/// Publishes on the event's model channel; returns the number of receivers reached.
	pub fn publish(&self, event: SubscriptionEvent) -> usize {
		let model = event.model.clone();
		let action = event.action;
		match self.sender(&model).send(Arc::new(event)) {
			Ok(receivers) => {
				tracing::debug!(%model, %action, receivers, "subscription event published");
				receivers
			}
			Err(_) => {
				tracing::trace!(%model, %action, "subscription event dropped: no subscribers");
				0
			}
		}
	}

	pub fn subscribe(&self, model: &str) -> broadcast::Receiver<Arc<SubscriptionEvent>> {
		self.sender(model).subscribe()
	}

	pub fn subscriber_count(&self, model: &str) -> usize {
		self.channels
			.get(model)
			.map(|tx| tx.receiver_count())
			.unwrap_or(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crudkit_core::SubscriptionAction;
	use rstest::rstest;
	use serde_json::json;

	fn event(model: &str) -> SubscriptionEvent {
		SubscriptionEvent::single(SubscriptionAction::Update, model, json!({"id": "1"}))
	}

	#[rstest]
	#[tokio::test]
	async fn test_channels_are_isolated_per_model() {
		let channels = ChannelRegistry::new(8);
		let mut users = channels.subscribe("user");
		let mut posts = channels.subscribe("post");

		channels.publish(event("user"));

		assert_eq!(users.recv().await.unwrap().model, "user");
		assert!(posts.try_recv().is_err());
	}

	#[rstest]
	fn test_publish_without_subscribers_is_dropped() {
		let channels = ChannelRegistry::new(8);

		assert_eq!(channels.publish(event("user")), 0);
		assert_eq!(channels.subscriber_count("user"), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_every_subscriber_receives_event() {
		let channels = ChannelRegistry::new(8);
		let mut first = channels.subscribe("user");
		let mut second = channels.subscribe("user");

		let reached = channels.publish(event("user"));

		assert_eq!(reached, 2);
		assert_eq!(first.recv().await.unwrap().entities, vec![json!({"id": "1"})]);
		assert_eq!(second.recv().await.unwrap().entities, vec![json!({"id": "1"})]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_slow_subscriber_lags_instead_of_blocking() {
		let channels = ChannelRegistry::new(1);
		let mut rx = channels.subscribe("user");

		channels.publish(event("user"));
		channels.publish(event("user"));

		assert!(matches!(
			rx.recv().await,
			Err(broadcast::error::RecvError::Lagged(1))
		));
	}
}
