//! Where-clause evaluation and result shaping over JSON rows

use crudkit_core::{CrudError, CrudResult, Entity};
use serde_json::{Map, Value};
use std::cmp::Ordering;

const OPERATORS: [&str; 12] = [
	"equals",
	"not",
	"in",
	"notIn",
	"lt",
	"lte",
	"gt",
	"gte",
	"contains",
	"startsWith",
	"endsWith",
	"mode",
];

/// Whether `entity` satisfies every entry of the where clause.
pub fn matches(entity: &Entity, filter: &Map<String, Value>) -> CrudResult<bool> {
	for (key, condition) in filter {
		let ok = match key.as_str() {
			"AND" => each_clause(condition)?
				.iter()
				.try_fold(true, |acc, clause| Ok::<_, CrudError>(acc && matches(entity, clause)?))?,
			"OR" => {
				let clauses = each_clause(condition)?;
				let mut any = false;
				for clause in clauses {
					if matches(entity, clause)? {
						any = true;
						break;
					}
				}
				any
			}
			"NOT" => {
				let mut none = true;
				for clause in each_clause(condition)? {
					if matches(entity, clause)? {
						none = false;
						break;
					}
				}
				none
			}
			field => {
				let value = entity.get(field).unwrap_or(&Value::Null);
				matches_field(value, condition)?
			}
		};
		if !ok {
			return Ok(false);
		}
	}
	Ok(true)
}

fn each_clause(condition: &Value) -> CrudResult<Vec<&Map<String, Value>>> {
	match condition {
		Value::Object(map) => Ok(vec![map]),
		Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_object()
					.ok_or_else(|| CrudError::invalid_argument("where", "logical operands must be objects"))
			})
			.collect(),
		other => Err(CrudError::invalid_argument(
			"where",
			format!("logical operator expects an object or a list, got {other}"),
		)),
	}
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
	!map.is_empty() && map.keys().all(|k| OPERATORS.contains(&k.as_str()))
}

fn matches_field(value: &Value, condition: &Value) -> CrudResult<bool> {
	match condition {
		Value::Object(ops) if is_operator_object(ops) => {
			let insensitive = ops.get("mode").and_then(Value::as_str) == Some("insensitive");
			for (op, operand) in ops {
				if !apply_operator(op, value, operand, insensitive)? {
					return Ok(false);
				}
			}
			Ok(true)
		}
		Value::Object(nested) => match value {
			Value::Object(_) => matches(value, nested),
			_ => Ok(false),
		},
		scalar => Ok(value == scalar),
	}
}

fn apply_operator(op: &str, value: &Value, operand: &Value, insensitive: bool) -> CrudResult<bool> {
	let result = match op {
		"equals" => text_eq(value, operand, insensitive),
		"not" => match operand {
			Value::Object(inner) if is_operator_object(inner) => !matches_field(value, operand)?,
			_ => !text_eq(value, operand, insensitive),
		},
		"in" => as_list(op, operand)?.iter().any(|v| v == value),
		"notIn" => !as_list(op, operand)?.iter().any(|v| v == value),
		"lt" => compare(value, operand) == Some(Ordering::Less),
		"lte" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
		"gt" => compare(value, operand) == Some(Ordering::Greater),
		"gte" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
		"contains" => text_test(value, operand, insensitive, |v, o| v.contains(o)),
		"startsWith" => text_test(value, operand, insensitive, |v, o| v.starts_with(o)),
		"endsWith" => text_test(value, operand, insensitive, |v, o| v.ends_with(o)),
		"mode" => true,
		other => {
			return Err(CrudError::invalid_argument("where", format!("unknown operator '{other}'")));
		}
	};
	Ok(result)
}

fn as_list<'a>(op: &str, operand: &'a Value) -> CrudResult<&'a Vec<Value>> {
	operand
		.as_array()
		.ok_or_else(|| CrudError::invalid_argument("where", format!("'{op}' expects a list")))
}

fn text_eq(value: &Value, operand: &Value, insensitive: bool) -> bool {
	match (value, operand) {
		(Value::String(v), Value::String(o)) if insensitive => v.to_lowercase() == o.to_lowercase(),
		_ => value == operand,
	}
}

fn text_test(value: &Value, operand: &Value, insensitive: bool, test: impl Fn(&str, &str) -> bool) -> bool {
	match (value.as_str(), operand.as_str()) {
		(Some(v), Some(o)) if insensitive => test(&v.to_lowercase(), &o.to_lowercase()),
		(Some(v), Some(o)) => test(v, o),
		_ => false,
	}
}

/// Orders two JSON scalars of the same kind; mixed kinds are incomparable.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		(Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
		(Value::Null, Value::Null) => Some(Ordering::Equal),
		_ => None,
	}
}

/// Parses `orderBy` given as `{field: dir}` or `[{field: dir}, ...]`.
fn sort_keys(order_by: &Value) -> CrudResult<Vec<(String, bool)>> {
	let clauses: Vec<&Map<String, Value>> = match order_by {
		Value::Object(map) => vec![map],
		Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_object()
					.ok_or_else(|| CrudError::invalid_argument("orderBy", "entries must be objects"))
			})
			.collect::<CrudResult<_>>()?,
		other => {
			return Err(CrudError::invalid_argument(
				"orderBy",
				format!("expected an object or a list, got {other}"),
			));
		}
	};
	let mut keys = Vec::new();
	for clause in clauses {
		for (field, direction) in clause {
			let descending = match direction.as_str() {
				Some("asc") => false,
				Some("desc") => true,
				_ => {
					return Err(CrudError::invalid_argument(
						"orderBy",
						format!("direction for '{field}' must be \"asc\" or \"desc\""),
					));
				}
			};
			keys.push((field.clone(), descending));
		}
	}
	Ok(keys)
}

/// Stable sort by the `orderBy` clause. Nulls sort first in ascending order.
pub fn sort(rows: &mut [Entity], order_by: &Value) -> CrudResult<()> {
	let keys = sort_keys(order_by)?;
	rows.sort_by(|a, b| {
		for (field, descending) in &keys {
			let left = a.get(field).unwrap_or(&Value::Null);
			let right = b.get(field).unwrap_or(&Value::Null);
			let ordering = match (left.is_null(), right.is_null()) {
				(true, false) => Ordering::Less,
				(false, true) => Ordering::Greater,
				_ => compare(left, right).unwrap_or(Ordering::Equal),
			};
			let ordering = if *descending { ordering.reverse() } else { ordering };
			if ordering != Ordering::Equal {
				return ordering;
			}
		}
		Ordering::Equal
	});
	Ok(())
}

/// Drops every row before the one matching `cursor`; the cursor row is kept.
///
/// An unknown cursor yields no rows.
pub fn apply_cursor(rows: Vec<Entity>, cursor: &Value) -> CrudResult<Vec<Entity>> {
	let cursor = cursor
		.as_object()
		.ok_or_else(|| CrudError::invalid_argument("cursor", "expected an object"))?;
	let position = rows.iter().position(|row| {
		cursor
			.iter()
			.all(|(field, value)| row.get(field) == Some(value))
	});
	Ok(match position {
		Some(start) => rows.into_iter().skip(start).collect(),
		None => Vec::new(),
	})
}

/// Keeps the first row of each distinct combination of `fields`.
pub fn apply_distinct(rows: Vec<Entity>, distinct: &Value) -> CrudResult<Vec<Entity>> {
	let fields: Vec<&str> = match distinct {
		Value::String(field) => vec![field.as_str()],
		Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_str()
					.ok_or_else(|| CrudError::invalid_argument("distinct", "expected field names"))
			})
			.collect::<CrudResult<_>>()?,
		other => {
			return Err(CrudError::invalid_argument(
				"distinct",
				format!("expected a field name or a list, got {other}"),
			));
		}
	};
	let mut seen: Vec<Vec<Value>> = Vec::new();
	let mut kept = Vec::new();
	for row in rows {
		let key: Vec<Value> = fields
			.iter()
			.map(|f| row.get(*f).cloned().unwrap_or(Value::Null))
			.collect();
		if !seen.contains(&key) {
			seen.push(key);
			kept.push(row);
		}
	}
	Ok(kept)
}
