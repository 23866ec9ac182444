//! CRUD service
//!
//! One [`CrudService`] per entity. It is the only place holding behavior:
//! resolvers translate GraphQL arguments and call in here, and the service
//! delegates to the storage collaborator and publishes change events.

use crate::config::{EntityConfig, SubscriptionLookup, subscription_lookup};
use crate::pubsub::ChannelRegistry;
use crate::rules::SelectionRules;
use crudkit_core::entity::{self, ID_FIELD};
use crudkit_core::{
	AbilityRef, CrudResult, CrudSettings, Entity, FindManyArgs, FindManyQuery, IdListSubscription,
	Pagination, RequestShape, Selection, SharedGuard, SharedSelection, SharedStorage,
	SubscriptionAction, SubscriptionEvent, SubscriptionResolver,
};
use crudkit_di::{DiResult, InjectionContext};
use futures_util::stream::BoxStream;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

pub struct CrudService {
	model: String,
	entity_type: String,
	storage: SharedStorage,
	selection: SharedSelection,
	rules: Arc<SelectionRules>,
	channels: Arc<ChannelRegistry>,
	subscription: Arc<dyn SubscriptionResolver>,
	guard: SharedGuard,
	settings: Arc<CrudSettings>,
	container: Arc<InjectionContext>,
}

impl CrudService {
	/// Builds the service from its module's container.
	///
	/// The container must hold the shared bindings registered by
	/// [`crate::CrudModule::for_root`] and the entity's subscription resolver.
	pub fn from_container(config: &EntityConfig, container: Arc<InjectionContext>) -> DiResult<Self> {
		let lookup: SubscriptionLookup = match &config.subscription {
			Some(custom) => custom.lookup,
			None => subscription_lookup::<IdListSubscription>,
		};
		Ok(Self {
			model: config.model_name.clone(),
			entity_type: config.entity_type().to_string(),
			storage: container.resolve_cloned::<SharedStorage>()?,
			selection: container.resolve_cloned::<SharedSelection>()?,
			rules: container.resolve::<SelectionRules>()?,
			channels: container.resolve::<ChannelRegistry>()?,
			subscription: lookup(&container)?,
			guard: container.resolve_cloned::<SharedGuard>()?,
			settings: container.resolve::<CrudSettings>()?,
			container,
		})
	}

	pub fn model(&self) -> &str {
		&self.model
	}

	pub fn entity_type(&self) -> &str {
		&self.entity_type
	}

	pub fn guard(&self) -> &SharedGuard {
		&self.guard
	}

	pub fn channels(&self) -> &Arc<ChannelRegistry> {
		&self.channels
	}

	pub fn container(&self) -> &Arc<InjectionContext> {
		&self.container
	}

	/// Parses the requested shape into the storage selection for rows of `type_name`.
	pub fn selection_for(&self, type_name: &str, shape: &RequestShape) -> Selection {
		self.rules.apply(type_name, self.selection.parse(shape))
	}

	/// Resolves a registered factory instance from the entity's container.
	pub fn get_factory<T: Any + Send + Sync>(&self) -> CrudResult<Arc<T>> {
		Ok(self.container.resolve::<T>()?)
	}

	fn publish(&self, action: SubscriptionAction, entities: Vec<Entity>) {
		self.channels
			.publish(SubscriptionEvent::many(action, self.model.clone(), entities));
	}

	pub async fn create(&self, data: Value, selection: &Selection) -> CrudResult<Entity> {
		let created = self.storage.create(&self.model, data, selection).await?;
		self.publish(SubscriptionAction::Create, vec![created.clone()]);
		Ok(created)
	}

	pub async fn find_one(
		&self,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Option<Entity>> {
		self.storage
			.find_one(&self.model, ability, filter, selection)
			.await
	}

	/// Normalizes either argument shape, then reads.
	pub async fn find_many(
		&self,
		ability: &AbilityRef,
		args: FindManyArgs,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let query = self.with_default_page_size(args.normalize());
		self.storage
			.find_many(&self.model, ability, query, selection)
			.await
	}

	fn with_default_page_size(&self, mut query: FindManyQuery) -> FindManyQuery {
		if let Some(size) = self.settings.default_page_size {
			let pagination = query.pagination.get_or_insert_with(Pagination::default);
			if pagination.take.is_none() {
				pagination.take = Some(size);
			}
		}
		query
	}

	pub async fn update(
		&self,
		ability: &AbilityRef,
		data: Value,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity> {
		let updated = self
			.storage
			.update(&self.model, ability, data, id, selection)
			.await?;
		self.publish(SubscriptionAction::Update, vec![updated.clone()]);
		Ok(updated)
	}

	/// Reads the matching rows, updates them, and reports the rows as read.
	///
	/// Rows changed concurrently between the read and the update are reported
	/// as they were at read time.
	pub async fn update_many(
		&self,
		ability: &AbilityRef,
		data: Value,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let affected = self
			.storage
			.find_many(&self.model, ability, FindManyQuery::filtered(filter.clone()), selection)
			.await?;
		self.storage
			.update_many(&self.model, ability, data, filter, selection)
			.await?;
		self.publish(SubscriptionAction::UpdateMany, affected.clone());
		Ok(affected)
	}

	/// Deletes the row and returns it projected through `selection`.
	///
	/// The published snapshot is the whole row, since subscribers may select
	/// fields the caller did not.
	pub async fn delete(
		&self,
		ability: &AbilityRef,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity> {
		let deleted = self
			.storage
			.delete(&self.model, ability, id, &Selection::new())
			.await?;
		let projected = selection.project(&deleted);
		self.publish(SubscriptionAction::Delete, vec![deleted]);
		Ok(projected)
	}

	/// Same read-then-write sequence as [`Self::update_many`], publishing
	/// whole rows like [`Self::delete`].
	pub async fn delete_many(
		&self,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let affected = self
			.storage
			.find_many(
				&self.model,
				ability,
				FindManyQuery::filtered(filter.clone()),
				&Selection::new(),
			)
			.await?;
		self.storage
			.delete_many(&self.model, ability, filter, selection)
			.await?;
		let projected = affected.iter().map(|row| selection.project(row)).collect();
		self.publish(SubscriptionAction::DeleteMany, affected);
		Ok(projected)
	}

	/// Fetches the target row by id; a blank id short-circuits to `None`.
	pub async fn resolve_one_to_one(
		&self,
		ability: &AbilityRef,
		target_model: &str,
		id: Option<&Value>,
		selection: &Selection,
	) -> CrudResult<Option<Entity>> {
		let Some(id) = id.filter(|v| !entity::is_blank(v)) else {
			return Ok(None);
		};
		let mut filter = Map::new();
		filter.insert(ID_FIELD.to_string(), id.clone());
		self.storage
			.find_one(target_model, ability, filter, selection)
			.await
	}

	/// Lists target rows owned by `parent_id`.
	///
	/// The foreign-key condition overrides a same-named key of the caller's
	/// where clause.
	pub async fn resolve_one_to_many(
		&self,
		ability: &AbilityRef,
		target_model: &str,
		foreign_key: &str,
		parent_id: Value,
		selection: &Selection,
		filter: Option<FindManyArgs>,
	) -> CrudResult<Vec<Entity>> {
		let mut query = filter.unwrap_or_default().normalize();
		let mut owner = Map::new();
		owner.insert(foreign_key.to_string(), parent_id);
		query.merge_where(owner);
		self.storage
			.find_many(target_model, ability, query, selection)
			.await
	}

	/// Stream of changed-entity lists for one subscriber.
	///
	/// The receiver is registered before this returns, so events published
	/// afterwards are never missed.
	pub fn subscribe(&self, args: Value, shape: &RequestShape) -> BoxStream<'static, CrudResult<Value>> {
		let mut rx = self.channels.subscribe(&self.model);
		let resolver = self.subscription.clone();
		let selection = self.selection_for(&self.entity_type, shape);
		let model = self.model.clone();
		Box::pin(async_stream::stream! {
			loop {
				match rx.recv().await {
					Ok(event) => match resolver.filter(&args, &event).await {
						Ok(true) => {
							yield resolver
								.resolve(&args, &event, &selection)
								.await
								.map(Value::Array);
						}
						Ok(false) => {}
						Err(e) => yield Err(e),
					},
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(%model, skipped, "subscriber lagged, events dropped");
					}
					Err(RecvError::Closed) => break,
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::CrudBuilder;
	use crate::config::EntityConfig;
	use crudkit_core::{
		AbilityGuard, AllowAll, InputDef, ObjectDef, ProjectionSelection, StorageAccess, TypeRef,
	};
	use crudkit_db::RecordingStorage;
	use crudkit_di::SingletonScope;
	use futures_util::StreamExt;
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn user_config() -> EntityConfig {
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
		.build()
	}

	struct Fixture {
		service: CrudService,
		storage: Arc<RecordingStorage>,
	}

	async fn service_with(settings: CrudSettings) -> Fixture {
		let config = user_config();
		let storage = Arc::new(RecordingStorage::memory());
		let scope = Arc::new(SingletonScope::new());
		scope.set(storage.clone() as SharedStorage);
		scope.set(Arc::new(ProjectionSelection) as SharedSelection);
		scope.set(Arc::new(AbilityGuard) as SharedGuard);
		scope.set(SelectionRules::from_configs([&config]));
		scope.set(ChannelRegistry::new(settings.channel_capacity));
		scope.set(settings);
		scope.set(IdListSubscription::new(storage.clone() as SharedStorage));
		let container = Arc::new(InjectionContext::builder(scope).name("UserCrudModule").build());
		Fixture {
			service: CrudService::from_container(&config, container).unwrap(),
			storage,
		}
	}

	#[fixture]
	fn ability() -> AbilityRef {
		Arc::new(AllowAll)
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_publishes_after_storage(ability: AbilityRef) {
		let Fixture { service, storage } = service_with(CrudSettings::default()).await;
		let mut rx = service.channels().subscribe("user");

		let created = service
			.create(json!({"name": "Ann"}), &Selection::new())
			.await
			.unwrap();

		let event = rx.recv().await.unwrap();
		assert_eq!(event.action, SubscriptionAction::Create);
		assert_eq!(event.entities, vec![created.clone()]);
		assert_eq!(storage.calls_to("create").len(), 1);
		let found = service
			.find_one(&ability, Map::new(), &Selection::of(["name"]))
			.await
			.unwrap();
		assert_eq!(found, Some(json!({"name": "Ann"})));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_update_publishes_nothing(ability: AbilityRef) {
		let Fixture { service, .. } = service_with(CrudSettings::default()).await;
		let mut rx = service.channels().subscribe("user");

		let result = service
			.update(&ability, json!({"name": "x"}), "missing", &Selection::new())
			.await;

		assert!(result.is_err());
		assert!(rx.try_recv().is_err());
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_many_reports_prefetched_snapshot(ability: AbilityRef) {
		let Fixture { service, storage } = service_with(CrudSettings::default()).await;
		for name in ["Ann", "Bob", "Ann"] {
			storage
				.create("user", json!({"name": name}), &Selection::new())
				.await
				.unwrap();
		}
		storage.clear();
		let mut rx = service.channels().subscribe("user");
		let mut filter = Map::new();
		filter.insert("name".to_string(), json!("Ann"));

		let first = service
			.update_many(&ability, json!({"role": "x"}), filter.clone(), &Selection::of(["name"]))
			.await
			.unwrap();
		let second = service
			.update_many(&ability, json!({"role": "x"}), filter, &Selection::of(["name"]))
			.await
			.unwrap();

		assert_eq!(first, vec![json!({"name": "Ann"}), json!({"name": "Ann"})]);
		assert_eq!(first, second);
		let ops: Vec<&str> = storage.calls().iter().map(|c| c.operation).collect();
		assert_eq!(ops, ["find_many", "update_many", "find_many", "update_many"]);
		let event = rx.recv().await.unwrap();
		assert_eq!(event.action, SubscriptionAction::UpdateMany);
		assert_eq!(event.entities, first);
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_publishes_whole_row(ability: AbilityRef) {
		let Fixture { service, .. } = service_with(CrudSettings::default()).await;
		service
			.create(json!({"id": "u1", "name": "Ann"}), &Selection::new())
			.await
			.unwrap();
		let mut rx = service.channels().subscribe("user");

		let deleted = service
			.delete(&ability, "u1", &Selection::of(["id"]))
			.await
			.unwrap();

		assert_eq!(deleted, json!({"id": "u1"}));
		let event = rx.recv().await.unwrap();
		assert_eq!(event.action, SubscriptionAction::Delete);
		assert_eq!(event.entities, vec![json!({"id": "u1", "name": "Ann"})]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_many_reports_rows_read_before_delete(ability: AbilityRef) {
		let Fixture { service, storage } = service_with(CrudSettings::default()).await;
		for (id, name) in [("u1", "Ann"), ("u2", "Bob"), ("u3", "Ann")] {
			storage
				.create("user", json!({"id": id, "name": name}), &Selection::new())
				.await
				.unwrap();
		}
		storage.clear();
		let mut rx = service.channels().subscribe("user");
		let mut filter = Map::new();
		filter.insert("name".to_string(), json!("Ann"));

		let deleted = service
			.delete_many(&ability, filter, &Selection::of(["id"]))
			.await
			.unwrap();

		assert_eq!(deleted, vec![json!({"id": "u1"}), json!({"id": "u3"})]);
		let ops: Vec<&str> = storage.calls().iter().map(|c| c.operation).collect();
		assert_eq!(ops, ["find_many", "delete_many"]);
		let event = rx.recv().await.unwrap();
		assert_eq!(event.action, SubscriptionAction::DeleteMany);
		let ids: Vec<&Value> = event.ids().collect();
		assert_eq!(ids, [&json!("u1"), &json!("u3")]);
		assert_eq!(event.entities[1], json!({"id": "u3", "name": "Ann"}));
		let remaining = service
			.find_many(&ability, FindManyArgs::default(), &Selection::of(["id"]))
			.await
			.unwrap();
		assert_eq!(remaining, vec![json!({"id": "u2"})]);
	}

	#[rstest]
	#[case(json!(null))]
	#[case(json!(""))]
	#[tokio::test]
	async fn test_blank_foreign_key_skips_storage(ability: AbilityRef, #[case] key: Value) {
		let Fixture { service, storage } = service_with(CrudSettings::default()).await;

		let author = service
			.resolve_one_to_one(&ability, "user", Some(&key), &Selection::new())
			.await
			.unwrap();

		assert_eq!(author, None);
		assert_eq!(storage.call_count(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_one_to_many_foreign_key_wins(ability: AbilityRef) {
		let Fixture { service, storage } = service_with(CrudSettings::default()).await;
		let args = FindManyArgs::from_value(json!({
			"where": {"authorId": "intruder", "title": {"contains": "rust"}},
			"pagination": {"take": 5}
		}))
		.unwrap();

		service
			.resolve_one_to_many(&ability, "post", "authorId", json!("u1"), &Selection::new(), Some(args))
			.await
			.unwrap();

		let call = &storage.calls_to("find_many")[0];
		assert_eq!(call.model, "post");
		assert_eq!(
			call.arguments,
			json!({
				"where": {"authorId": "u1", "title": {"contains": "rust"}},
				"pagination": {"take": 5}
			})
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_default_page_size_applies_without_take(ability: AbilityRef) {
		let Fixture { service, storage } = service_with(CrudSettings {
			default_page_size: Some(20),
			..CrudSettings::default()
		})
		.await;

		service
			.find_many(&ability, FindManyArgs::default(), &Selection::new())
			.await
			.unwrap();

		assert_eq!(
			storage.calls_to("find_many")[0].arguments,
			json!({"where": {}, "pagination": {"take": 20}})
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_subscription_filters_by_ids(ability: AbilityRef) {
		let Fixture { service, .. } = service_with(CrudSettings::default()).await;
		let shape = RequestShape::node("users", vec![RequestShape::leaf("name")]);
		let mut stream = service.subscribe(json!({"ids": ["u2"]}), &shape);

		service
			.create(json!({"id": "u1", "name": "Ann"}), &Selection::new())
			.await
			.unwrap();
		service
			.update(&ability, json!({"name": "Bo"}), "u1", &Selection::new())
			.await
			.ok();
		service
			.create(json!({"id": "u2", "name": "Bob"}), &Selection::new())
			.await
			.unwrap();

		let delivered = stream.next().await.unwrap().unwrap();
		assert_eq!(delivered, json!([{"id": "u2", "name": "Bob"}]));
	}
}
