//! Field selection
//!
//! A [`RequestShape`] is the engine-neutral description of the fields a
//! caller asked for. A [`FieldSelection`] turns it into a [`Selection`] tree,
//! which storage adapters use to avoid over-fetching.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field tree requested by the caller for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestShape {
	pub name: String,
	pub children: Vec<RequestShape>,
}

impl RequestShape {
	pub fn leaf(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			children: Vec::new(),
		}
	}

	pub fn node(name: impl Into<String>, children: Vec<RequestShape>) -> Self {
		Self {
			name: name.into(),
			children,
		}
	}

	/// Sub-shape requested under the field `name`, if any.
	pub fn child(&self, name: &str) -> Option<&RequestShape> {
		self.children.iter().find(|c| c.name == name)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionNode {
	Field,
	Nested(Selection),
}

/// Nested projection tree.
///
/// An empty selection means "no projection": storage returns whole rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
	fields: BTreeMap<String, SelectionNode>,
}

impl Selection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a flat selection from field names.
	///
	/// # Examples
	///
	/// ```
	/// use crudkit_core::Selection;
	///
	/// let selection = Selection::of(["id", "name"]);
	/// assert!(selection.contains("name"));
	/// assert!(!selection.contains("email"));
	/// ```
	pub fn of<I, S>(fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut selection = Self::new();
		for field in fields {
			selection.insert_field(field);
		}
		selection
	}

	pub fn insert_field(&mut self, name: impl Into<String>) {
		self.fields.entry(name.into()).or_insert(SelectionNode::Field);
	}

	pub fn insert_nested(&mut self, name: impl Into<String>, selection: Selection) {
		self.fields.insert(name.into(), SelectionNode::Nested(selection));
	}

	pub fn remove(&mut self, name: &str) -> Option<SelectionNode> {
		self.fields.remove(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.fields.contains_key(name)
	}

	pub fn get(&self, name: &str) -> Option<&SelectionNode> {
		self.fields.get(name)
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	/// Renders the tree in the `{field: true, relation: {select: {...}}}` form
	/// understood by ORM-style storage layers.
	pub fn to_json(&self) -> Value {
		let map: Map<String, Value> = self
			.fields
			.iter()
			.map(|(name, node)| {
				let value = match node {
					SelectionNode::Field => Value::Bool(true),
					SelectionNode::Nested(inner) => {
						let mut select = Map::new();
						select.insert("select".to_string(), inner.to_json());
						Value::Object(select)
					}
				};
				(name.clone(), value)
			})
			.collect();
		Value::Object(map)
	}

	/// Applies the projection to an entity value.
	pub fn project(&self, value: &Value) -> Value {
		if self.is_empty() {
			return value.clone();
		}
		match value {
			Value::Object(map) => {
				let projected = self
					.fields
					.iter()
					.filter_map(|(name, node)| {
						let field = map.get(name)?;
						let field = match node {
							SelectionNode::Field => field.clone(),
							SelectionNode::Nested(inner) => inner.project(field),
						};
						Some((name.clone(), field))
					})
					.collect();
				Value::Object(projected)
			}
			Value::Array(items) => Value::Array(items.iter().map(|v| self.project(v)).collect()),
			other => other.clone(),
		}
	}
}

/// Field-Selection collaborator: turns a request shape into a projection.
pub trait FieldSelection: Send + Sync + 'static {
	fn parse(&self, shape: &RequestShape) -> Selection;
}

pub type SharedSelection = Arc<dyn FieldSelection>;

/// Default parser: every leaf becomes a selected field, every field with
/// children a nested sub-selection. Introspection fields are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionSelection;

impl FieldSelection for ProjectionSelection {
	fn parse(&self, shape: &RequestShape) -> Selection {
		let mut selection = Selection::new();
		for child in &shape.children {
			if child.name.starts_with("__") {
				continue;
			}
			if child.children.is_empty() {
				selection.insert_field(child.name.clone());
			} else {
				selection.insert_nested(child.name.clone(), self.parse(child));
			}
		}
		selection
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn user_shape() -> RequestShape {
		RequestShape::node(
			"userFindOne",
			vec![
				RequestShape::leaf("id"),
				RequestShape::leaf("__typename"),
				RequestShape::node("profile", vec![RequestShape::leaf("bio")]),
			],
		)
	}

	#[rstest]
	fn test_projection_parser_builds_nested_tree() {
		let selection = ProjectionSelection.parse(&user_shape());

		assert_eq!(
			selection.to_json(),
			json!({"id": true, "profile": {"select": {"bio": true}}})
		);
	}

	#[rstest]
	fn test_project_keeps_only_selected_fields() {
		let selection = ProjectionSelection.parse(&user_shape());
		let row = json!({"id": "u1", "name": "Ann", "profile": {"bio": "hi", "age": 3}});

		assert_eq!(
			selection.project(&row),
			json!({"id": "u1", "profile": {"bio": "hi"}})
		);
	}

	#[rstest]
	fn test_empty_selection_projects_everything() {
		let row = json!({"id": "u1", "name": "Ann"});

		assert_eq!(Selection::new().project(&row), row);
	}

	#[rstest]
	fn test_insert_field_does_not_flatten_nested() {
		let mut selection = Selection::new();
		selection.insert_nested("posts", Selection::of(["title"]));
		selection.insert_field("posts");

		assert!(matches!(selection.get("posts"), Some(SelectionNode::Nested(_))));
	}
}
