//! Find-many argument handling
//!
//! `findMany` accepts either the simple `{where, pagination}` shape or a
//! richer ORM-style shape (`orderBy`, `cursor`, `distinct`, `take`, `skip`).
//! The shape is detected once, at the boundary, into [`FindManyArgs`], and
//! immediately normalized into the canonical [`FindManyQuery`].

use crate::{CrudError, CrudResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SIMPLE_KEYS: [&str; 2] = ["where", "pagination"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub take: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub skip: Option<i64>,
}

impl Pagination {
	pub fn new(take: i64, skip: i64) -> Self {
		Self {
			take: Some(take),
			skip: Some(skip),
		}
	}

	fn from_parts(take: Option<i64>, skip: Option<i64>) -> Option<Self> {
		if take.is_none() && skip.is_none() {
			None
		} else {
			Some(Self { take, skip })
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimpleFindMany {
	#[serde(default, rename = "where")]
	pub filter: Option<Value>,
	#[serde(default)]
	pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedFindMany {
	#[serde(default, rename = "where")]
	pub filter: Option<Value>,
	#[serde(default)]
	pub order_by: Option<Value>,
	#[serde(default)]
	pub cursor: Option<Value>,
	#[serde(default)]
	pub distinct: Option<Value>,
	#[serde(default)]
	pub take: Option<i64>,
	#[serde(default)]
	pub skip: Option<i64>,
}

/// The two accepted `findMany` argument shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FindManyArgs {
	Simple(SimpleFindMany),
	Advanced(AdvancedFindMany),
}

impl Default for FindManyArgs {
	fn default() -> Self {
		Self::Simple(SimpleFindMany::default())
	}
}

impl FindManyArgs {
	/// Detects the argument shape of a raw `filter` value.
	///
	/// `null` is the empty simple shape. Null-valued keys are ignored. An
	/// object whose keys are all `where`/`pagination` is the simple shape;
	/// anything else is advanced.
	///
	/// # Examples
	///
	/// ```
	/// use crudkit_core::FindManyArgs;
	/// use serde_json::json;
	///
	/// let simple = FindManyArgs::from_value(json!({"where": {}, "pagination": {"take": 5}})).unwrap();
	/// assert!(matches!(simple, FindManyArgs::Simple(_)));
	///
	/// let advanced = FindManyArgs::from_value(json!({"take": 5, "orderBy": {"name": "asc"}})).unwrap();
	/// assert!(matches!(advanced, FindManyArgs::Advanced(_)));
	/// ```
	pub fn from_value(value: Value) -> CrudResult<Self> {
		let value = match value {
			Value::Object(map) => {
				Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
			}
			other => other,
		};
		let is_simple = matches!(
			&value,
			Value::Object(map) if map.keys().all(|k| SIMPLE_KEYS.contains(&k.as_str()))
		);
		match value {
			Value::Null => Ok(Self::default()),
			Value::Object(_) if is_simple => {
				serde_json::from_value(value)
					.map(Self::Simple)
					.map_err(|e| CrudError::invalid_argument("filter", e))
			}
			Value::Object(_) => serde_json::from_value(value)
				.map(Self::Advanced)
				.map_err(|e| CrudError::invalid_argument("filter", e)),
			other => Err(CrudError::invalid_argument(
				"filter",
				format!("expected an object, got {other}"),
			)),
		}
	}

	pub fn simple(filter: Option<Value>, pagination: Option<Pagination>) -> Self {
		Self::Simple(SimpleFindMany { filter, pagination })
	}

	/// Converts either shape into the canonical storage query.
	pub fn normalize(self) -> FindManyQuery {
		match self {
			Self::Simple(args) => FindManyQuery {
				filter: where_object(args.filter),
				pagination: args
					.pagination
					.and_then(|p| Pagination::from_parts(p.take, p.skip)),
				order_by: None,
				cursor: None,
				distinct: None,
			},
			Self::Advanced(args) => FindManyQuery {
				filter: where_object(args.filter),
				pagination: Pagination::from_parts(args.take, args.skip),
				order_by: args.order_by.filter(|v| !v.is_null()),
				cursor: args.cursor.filter(|v| !v.is_null()),
				distinct: args.distinct.filter(|v| !v.is_null()),
			},
		}
	}
}

fn where_object(filter: Option<Value>) -> Map<String, Value> {
	match filter {
		Some(Value::Object(map)) => map,
		_ => Map::new(),
	}
}

/// Canonical find-many call handed to the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyQuery {
	#[serde(rename = "where")]
	pub filter: Map<String, Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pagination: Option<Pagination>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_by: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cursor: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub distinct: Option<Value>,
}

impl FindManyQuery {
	pub fn filtered(filter: Map<String, Value>) -> Self {
		Self {
			filter,
			..Self::default()
		}
	}

	/// Merges `overrides` into the where clause; keys in `overrides` win.
	pub fn merge_where(&mut self, overrides: Map<String, Value>) {
		self.filter.extend(overrides);
	}

	pub fn where_value(&self) -> Value {
		Value::Object(self.filter.clone())
	}
}
