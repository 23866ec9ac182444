//! Authorization boundary
//!
//! Access-control policy lives in an external ability library. crudkit only
//! asks the request's [`Ability`] whether an action is allowed and forwards
//! the filter conditions it produces to the storage collaborator.

use crate::{CrudError, CrudResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
	Read,
	Create,
	Update,
	Delete,
	Manage,
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Read => "read",
			Self::Create => "create",
			Self::Update => "update",
			Self::Delete => "delete",
			Self::Manage => "manage",
		};
		f.write_str(name)
	}
}

/// One `(action, subject)` requirement attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
	pub action: Action,
	pub subject: String,
}

impl Permission {
	pub fn new(action: Action, subject: impl Into<String>) -> Self {
		Self {
			action,
			subject: subject.into(),
		}
	}
}

/// Per-request authorization context produced by the access-control library.
pub trait Ability: Send + Sync + 'static {
	fn can(&self, action: Action, subject: &str) -> bool;

	/// Where-clause restricting rows of `subject` to those `action` may touch.
	fn conditions(&self, _action: Action, _subject: &str) -> Option<Value> {
		None
	}
}

pub type AbilityRef = Arc<dyn Ability>;

/// Ability granting everything, without conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Ability for AllowAll {
	fn can(&self, _action: Action, _subject: &str) -> bool {
		true
	}
}

/// Checks an operation's permission list before its handler runs.
#[async_trait]
pub trait AuthorizationGuard: Send + Sync + 'static {
	async fn authorize(&self, ability: &AbilityRef, permissions: &[Permission]) -> CrudResult<()>;
}

pub type SharedGuard = Arc<dyn AuthorizationGuard>;

/// Default guard: every listed permission must pass [`Ability::can`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AbilityGuard;

#[async_trait]
impl AuthorizationGuard for AbilityGuard {
	async fn authorize(&self, ability: &AbilityRef, permissions: &[Permission]) -> CrudResult<()> {
		match permissions
			.iter()
			.find(|p| !ability.can(p.action, &p.subject))
		{
			Some(denied) => Err(CrudError::Authorization(format!(
				"cannot {} {}",
				denied.action, denied.subject
			))),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct ReadOnly;

	impl Ability for ReadOnly {
		fn can(&self, action: Action, _subject: &str) -> bool {
			action == Action::Read
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_allows_matching_permissions() {
		let ability: AbilityRef = Arc::new(ReadOnly);

		let result = AbilityGuard
			.authorize(&ability, &[Permission::new(Action::Read, "user")])
			.await;

		assert!(result.is_ok());
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_reports_first_denied_permission() {
		let ability: AbilityRef = Arc::new(ReadOnly);

		let err = AbilityGuard
			.authorize(
				&ability,
				&[
					Permission::new(Action::Read, "user"),
					Permission::new(Action::Delete, "user"),
				],
			)
			.await
			.unwrap_err();

		assert_eq!(err.to_string(), "cannot delete user");
		assert_eq!(err.code(), "FORBIDDEN");
	}

	#[rstest]
	#[tokio::test]
	async fn test_empty_permission_list_is_always_allowed() {
		let ability: AbilityRef = Arc::new(ReadOnly);

		assert!(AbilityGuard.authorize(&ability, &[]).await.is_ok());
	}
}
