//! Contracts, type descriptors and settings.
//!
//! ```rust
//! use crudkit::core::{FindManyArgs, TypeRef};
//!
//! assert_eq!(TypeRef::named_nn_list_nn("Post").to_string(), "[Post!]!");
//! assert!(FindManyArgs::from_value(serde_json::Value::Null).is_ok());
//! ```

pub use crudkit_core::*;
