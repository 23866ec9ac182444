//! Per-type adjustments applied to parsed selections
//!
//! Relation and custom fields are resolved by synthesized resolvers, so
//! they are stripped from what storage is asked for. The row id and every
//! one-to-one foreign key are always fetched, since those resolvers read
//! them off the parent. Selecting a hand-resolved field fetches the whole
//! row, since its resolver may read any column.

use crate::config::EntityConfig;
use crudkit_core::Selection;
use crudkit_core::entity::ID_FIELD;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
struct TypeRules {
	required: Vec<String>,
	computed: Vec<String>,
	opaque: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct SelectionRules {
	types: HashMap<String, TypeRules>,
}

impl SelectionRules {
	pub fn from_configs<'a, I>(configs: I) -> Self
	where
		I: IntoIterator<Item = &'a EntityConfig>,
	{
		let mut types = HashMap::new();
		for config in configs {
			let mut required = vec![ID_FIELD.to_string()];
			required.extend(config.one_to_one_keys().into_iter().map(str::to_string));
			let computed = config
				.computed_fields()
				.into_iter()
				.map(str::to_string)
				.collect();
			let opaque = config
				.opaque_fields()
				.into_iter()
				.map(str::to_string)
				.collect();
			types.insert(
				config.entity_type().to_string(),
				TypeRules {
					required,
					computed,
					opaque,
				},
			);
		}
		Self { types }
	}

	/// Adjusts `selection` for rows of `type_name`.
	///
	/// An empty selection stays empty: storage then returns whole rows.
	/// So does any selection naming a hand-resolved field.
	pub fn apply(&self, type_name: &str, mut selection: Selection) -> Selection {
		let Some(rules) = self.types.get(type_name) else {
			return selection;
		};
		if selection.is_empty() || rules.opaque.iter().any(|f| selection.contains(f)) {
			return Selection::new();
		}
		for field in &rules.computed {
			selection.remove(field);
		}
		for field in &rules.required {
			selection.insert_field(field.clone());
		}
		selection
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::CrudBuilder;
	use crate::config::{OneToManyRelation, OneToOneRelation};
	use crudkit_core::{InputDef, ObjectDef, TypeRef};
	use rstest::rstest;

	fn post_config() -> EntityConfig {
		CrudBuilder::new(
			ObjectDef::new("Post")
				.field("id", TypeRef::named_nn(TypeRef::ID))
				.field("title", TypeRef::named_nn(TypeRef::STRING)),
		)
		.with_config(
			"post",
			InputDef::new("PostCreateInput"),
			InputDef::new("PostUpdateInput"),
			InputDef::new("PostUpdateManyInput"),
			InputDef::new("PostWhereInput"),
		)
		.add_one_to_one_relation(OneToOneRelation::new("author", "user", "User", "authorId"))
		.add_relation(OneToManyRelation::new("comments", "comment", "Comment", "postId"))
		.build()
	}

	#[rstest]
	fn test_relation_fields_are_swapped_for_keys() {
		let rules = SelectionRules::from_configs([&post_config()]);
		let mut selection = Selection::of(["title"]);
		selection.insert_nested("author", Selection::of(["name"]));
		selection.insert_nested("comments", Selection::of(["body"]));

		let adjusted = rules.apply("Post", selection);

		let fields: Vec<&str> = adjusted.field_names().collect();
		assert_eq!(fields, ["authorId", "id", "title"]);
	}

	#[rstest]
	fn test_empty_selection_is_left_alone() {
		let rules = SelectionRules::from_configs([&post_config()]);

		assert!(rules.apply("Post", Selection::new()).is_empty());
	}

	#[rstest]
	fn test_unknown_type_is_untouched() {
		let rules = SelectionRules::from_configs([&post_config()]);

		assert_eq!(
			rules.apply("Tag", Selection::of(["label"])),
			Selection::of(["label"])
		);
	}
}
