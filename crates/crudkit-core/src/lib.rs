//! # crudkit core
//!
//! Contracts shared by every crudkit component:
//!
//! - [`storage::StorageAccess`]: the pluggable ORM/database collaborator
//! - [`selection::FieldSelection`]: request shape to storage projection
//! - [`relation::CustomRelationResolver`]: hand-written relation fields
//! - [`subscription::SubscriptionResolver`]: per-subscriber filtering and
//!   re-resolution of change events
//! - [`auth::Ability`] and [`auth::AuthorizationGuard`]: the boundary to the
//!   external access-control library
//!
//! plus the declarative GraphQL type descriptors ([`types`]), the canonical
//! find-many query shape ([`query`]), runtime settings and the error type.

pub mod auth;
pub mod entity;
pub mod error;
pub mod query;
pub mod relation;
pub mod selection;
pub mod settings;
pub mod storage;
pub mod subscription;
pub mod types;

pub use auth::{
	Ability, AbilityGuard, AbilityRef, Action, AllowAll, AuthorizationGuard, Permission,
	SharedGuard,
};
pub use entity::Entity;
pub use error::{ConfigError, CrudError, CrudResult};
pub use query::{FindManyArgs, FindManyQuery, Pagination};
pub use relation::{CustomRelationResolver, RelationOutput};
pub use selection::{FieldSelection, ProjectionSelection, RequestShape, Selection, SharedSelection};
pub use settings::{CrudSettings, SettingsError};
pub use storage::{SharedStorage, StorageAccess};
pub use subscription::{
	IdListSubscription, SubscriptionAction, SubscriptionEvent, SubscriptionResolver,
};
pub use types::{EnumDef, FieldDef, InputDef, ObjectDef, TypeDef, TypeRef};
