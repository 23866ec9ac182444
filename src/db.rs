//! In-memory storage adapter and the recording test double.

pub use crudkit_db::*;
