//! # crudkit
//!
//! Declarative GraphQL CRUD modules. Describe an entity once (its object
//! type, inputs, relations and custom operations) and crudkit generates the
//! resolvers, the service layer, the module wiring and the subscription
//! channel around a pluggable storage collaborator.
//!
//! ## Crates
//!
//! - [`core`]: storage, selection, relation, subscription and authorization
//!   contracts, type descriptors, settings
//! - [`di`]: scoped dependency injection used by the module system
//! - [`graphql`]: configuration builder, resolver synthesis, services,
//!   modules, application bootstrap and schema binding
//! - [`db`] (feature `memory`, default): in-memory storage adapter
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use crudkit::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), BootstrapError> {
//! let user = CrudBuilder::new(
//!     ObjectDef::new("User")
//!         .field("id", TypeRef::named_nn(TypeRef::ID))
//!         .field("name", TypeRef::named_nn(TypeRef::STRING)),
//! )
//! .with_config(
//!     "user",
//!     InputDef::new("UserCreateInput").field("name", TypeRef::named_nn(TypeRef::STRING)),
//!     InputDef::new("UserUpdateInput").field("name", TypeRef::named(TypeRef::STRING)),
//!     InputDef::new("UserUpdateManyInput").field("name", TypeRef::named(TypeRef::STRING)),
//!     InputDef::new("UserWhereInput").field("name", TypeRef::named("StringFilter")),
//! )
//! .build();
//!
//! let storage: SharedStorage = Arc::new(MemoryStorage::new());
//! let app = Application::bootstrap(CrudModule::for_root([user], CrudModuleOptions::new(storage))).await?;
//! let schema = app.schema()?;
//!
//! let ability: AbilityRef = Arc::new(AllowAll);
//! let response = schema
//!     .execute(async_graphql::Request::new(r#"mutation { userCreate(data: {name: "Ann"}) { id } }"#).data(ability))
//!     .await;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod core;
#[cfg(feature = "memory")]
pub mod db;
pub mod di;
pub mod graphql;

pub use crudkit_core::{
	Ability, AbilityRef, Action, AllowAll, CrudError, CrudResult, CrudSettings, Entity,
	Permission, SharedStorage, StorageAccess,
};
pub use crudkit_graphql::{
	Application, BootstrapError, CrudBuilder, CrudModule, CrudModuleOptions, DynamicModule,
};

#[cfg(feature = "memory")]
pub use crudkit_db::MemoryStorage;

/// Everything needed to declare entities and serve them.
pub mod prelude {
	pub use crudkit_core::{
		Ability, AbilityGuard, AbilityRef, Action, AllowAll, AuthorizationGuard, ConfigError,
		CrudError, CrudResult, CrudSettings, CustomRelationResolver, Entity, EnumDef, FindManyArgs,
		InputDef, ObjectDef, Permission, RelationOutput, Selection, SharedStorage, StorageAccess,
		SubscriptionEvent, SubscriptionResolver, TypeDef, TypeRef,
	};
	pub use crudkit_di::{DiError, DiResult, Export, Injectable, InjectionContext, Provider};
	pub use crudkit_graphql::config::{OneToManyRelation, OneToOneRelation};
	pub use crudkit_graphql::{
		Application, BootstrapError, CrudBuilder, CrudModule, CrudModuleOptions, CustomOperation,
		CustomRelation, DynamicModule, GraphQLContextExt,
	};

	#[cfg(feature = "memory")]
	pub use crudkit_db::MemoryStorage;

	// External
	pub use async_trait::async_trait;
}
