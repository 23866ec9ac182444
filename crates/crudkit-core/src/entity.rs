//! Entity values
//!
//! Entities travel through crudkit as JSON objects; the storage collaborator
//! owns their concrete shape.

use serde_json::Value;

pub type Entity = Value;

/// Name of the primary key field every entity is expected to carry.
pub const ID_FIELD: &str = "id";

/// Reads the primary key of an entity.
pub fn id_of(entity: &Entity) -> Option<&Value> {
	entity.get(ID_FIELD).filter(|v| !is_blank(v))
}

/// Whether a key value counts as absent: `null`, missing or an empty string.
pub fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(json!(null), true)]
	#[case(json!(""), true)]
	#[case(json!("u1"), false)]
	#[case(json!(0), false)]
	fn test_is_blank(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(is_blank(&value), expected);
	}

	#[rstest]
	fn test_id_of_ignores_blank_ids() {
		assert_eq!(id_of(&json!({"id": "u1"})), Some(&json!("u1")));
		assert_eq!(id_of(&json!({"id": ""})), None);
		assert_eq!(id_of(&json!({"name": "Ann"})), None);
	}
}
