//! # crudkit GraphQL
//!
//! Declarative CRUD modules on top of `async-graphql`'s dynamic schema.
//!
//! ## Flow
//!
//! 1. [`CrudBuilder`] accumulates one [`EntityConfig`] per entity.
//! 2. [`CrudModule::for_root`] synthesizes a [`ResolverRegistry`] per entity
//!    and wraps everything into a module tree.
//! 3. [`Application::bootstrap`] builds the module containers and the
//!    [`CrudService`]s.
//! 4. [`Application::schema`] binds the registries into an executable schema.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crudkit_core::{InputDef, ObjectDef, TypeRef};
//! use crudkit_db::MemoryStorage;
//! use crudkit_graphql::{Application, CrudBuilder, CrudModule, CrudModuleOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), crudkit_graphql::BootstrapError> {
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
//! let root = CrudModule::for_root([user], CrudModuleOptions::new(Arc::new(MemoryStorage::new())));
//! let app = Application::bootstrap(root).await?;
//! let schema = app.schema()?;
//! # let _ = schema;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod module;
pub mod pubsub;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod service;
pub mod synthesis;

pub use app::{Application, MountedEntity};
pub use builder::{CrudBuilder, CustomResolverBuilder, EntityConfigBuilder};
pub use config::{
	BindingKind, CustomOperation, CustomRelation, EntityConfig, OneToManyRelation,
	OneToOneRelation, RelationConfig,
};
pub use context::GraphQLContextExt;
pub use error::BootstrapError;
pub use filters::{subscription_filter, subscription_filter_name};
pub use module::{CrudModule, CrudModuleOptions, DynamicModule};
pub use pubsub::ChannelRegistry;
pub use registry::{ArgumentDef, OperationDescriptor, OperationKind, ResolverRegistry};
pub use rules::SelectionRules;
pub use service::CrudService;
