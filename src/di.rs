//! Dependency injection used by the module system.

pub use crudkit_di::*;
