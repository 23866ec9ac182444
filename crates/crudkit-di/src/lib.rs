//! # crudkit dependency injection
//!
//! Type-keyed dependency container used by crudkit modules.
//!
//! ## Features
//!
//! - **Scoped**: one application-lifetime singleton scope per module
//! - **Async-first**: providers are async factories run at bootstrap
//! - **Module isolation**: every module owns a singleton scope seeded with the
//!   exports of the modules it imports
//!
//! ## Example
//!
//! ```rust
//! use crudkit_di::{InjectionContext, Provider, SingletonScope};
//! use std::sync::Arc;
//!
//! let singleton = Arc::new(SingletonScope::new());
//! let ctx = InjectionContext::builder(singleton).name("UserCrudModule").build();
//!
//! ctx.set_singleton(String::from("postgres://localhost/app"));
//! assert_eq!(*ctx.resolve::<String>().unwrap(), "postgres://localhost/app");
//! ```

pub mod context;
pub mod error;
pub mod injectable;
pub mod provider;
pub mod scope;

pub use context::{InjectionContext, InjectionContextBuilder};
pub use error::{DiError, DiResult};
pub use injectable::Injectable;
pub use provider::{Export, Provider, ProviderFn, ProviderFuture};
pub use scope::SingletonScope;
