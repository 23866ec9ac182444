//! Default subscription filter inputs
//!
//! `{Model}SubscriptionFilter { ids: [ID!] }` is generated once per model
//! name and kept for the life of the process.

use convert_case::{Case, Casing};
use crudkit_core::{InputDef, TypeRef};
use dashmap::DashMap;
use once_cell::sync::Lazy;

static SUBSCRIPTION_FILTERS: Lazy<DashMap<String, InputDef>> = Lazy::new(DashMap::new);

pub fn subscription_filter_name(model: &str) -> String {
	format!("{}SubscriptionFilter", model.to_case(Case::Pascal))
}

/// Returns the filter input for `model`, generating it on first request.
pub fn subscription_filter(model: &str) -> InputDef {
	SUBSCRIPTION_FILTERS
		.entry(model.to_string())
		.or_insert_with(|| {
			tracing::debug!(model, "subscription filter input generated");
			InputDef::new(subscription_filter_name(model))
				.field("ids", TypeRef::named_nn_list(TypeRef::ID))
		})
		.clone()
}

pub fn registered_filters() -> usize {
	SUBSCRIPTION_FILTERS.len()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_filter_is_generated_once_per_model() {
		let first = subscription_filter("blogPost");
		let second = subscription_filter("blogPost");

		assert_eq!(first, second);
		assert_eq!(first.name, "BlogPostSubscriptionFilter");
		assert!(registered_filters() >= 1);
	}
}
