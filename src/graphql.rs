//! Entity configuration, resolver synthesis and schema binding.

pub use crudkit_graphql::*;
