//! GraphQL request context helpers
//!
//! The schema stores the root [`InjectionContext`] in its data; each request
//! carries the caller's [`AbilityRef`] in its request data:
//!
//! ```rust,no_run
//! # use crudkit_core::{AbilityRef, AllowAll};
//! # use std::sync::Arc;
//! # fn example(schema: async_graphql::dynamic::Schema) {
//! let ability: AbilityRef = Arc::new(AllowAll);
//! let request = async_graphql::Request::new("{ userFindMany { id } }").data(ability);
//! # let _ = schema.execute(request);
//! # }
//! ```

use async_graphql::dynamic::ObjectAccessor;
use async_graphql::{Context, ErrorExtensions, SelectionField};
use crudkit_core::{AbilityRef, CrudError, RequestShape};
use crudkit_di::InjectionContext;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Extension trait for `async_graphql::Context`.
pub trait GraphQLContextExt {
	/// Extract the DI context stored in the schema data.
	fn get_di_context(&self) -> async_graphql::Result<&Arc<InjectionContext>>;

	/// The request's authorization context; `UNAUTHENTICATED` when absent.
	fn ability(&self) -> async_graphql::Result<AbilityRef>;
}

impl GraphQLContextExt for Context<'_> {
	fn get_di_context(&self) -> async_graphql::Result<&Arc<InjectionContext>> {
		self.data::<Arc<InjectionContext>>()
	}

	fn ability(&self) -> async_graphql::Result<AbilityRef> {
		self.data_opt::<AbilityRef>()
			.cloned()
			.ok_or_else(|| into_graphql_error(CrudError::MissingAbility))
	}
}

/// Converts a service error, keeping its message and adding `extensions.code`.
pub fn into_graphql_error(err: CrudError) -> async_graphql::Error {
	let code = err.code();
	async_graphql::Error::new(err.to_string()).extend_with(|_, ext| ext.set("code", code.to_string()))
}

/// Field tree the caller requested under `field`, fragments flattened.
pub fn request_shape(field: SelectionField<'_>) -> RequestShape {
	RequestShape::node(field.name(), field.selection_set().map(request_shape).collect())
}

pub fn arguments(args: &ObjectAccessor<'_>) -> async_graphql::Result<Map<String, Value>> {
	let mut map = Map::new();
	for (name, value) in args.as_index_map() {
		map.insert(name.to_string(), value.clone().into_json()?);
	}
	Ok(map)
}
