//! # crudkit db
//!
//! Default Storage Access adapter.
//!
//! [`MemoryStorage`] keeps one table of JSON rows per model name and
//! evaluates ORM-style where clauses (`equals`, `in`, `contains`, `AND`,
//! `OR`, `NOT`, ...), ordering, cursors, `distinct` and pagination against
//! them. It honors the filter conditions produced by the request's ability,
//! so it can stand in for a real database in tests and prototypes.
//!
//! ```
//! use crudkit_core::{AbilityRef, AllowAll, FindManyQuery, Selection, StorageAccess};
//! use crudkit_db::MemoryStorage;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let storage = MemoryStorage::new();
//! let ability: AbilityRef = Arc::new(AllowAll);
//! storage.create("user", json!({"name": "Ann"}), &Selection::new()).await.unwrap();
//!
//! let rows = storage
//!     .find_many("user", &ability, FindManyQuery::default(), &Selection::of(["name"]))
//!     .await
//!     .unwrap();
//! assert_eq!(rows, vec![json!({"name": "Ann"})]);
//! # }
//! ```

pub mod filter;
pub mod memory;
pub mod testing;

pub use memory::MemoryStorage;
pub use testing::{RecordingStorage, StorageCall};
