//! Error types shared across crudkit crates

use crudkit_di::DiError;

/// Errors produced while configuring entities, before any request is served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	#[error("custom resolver class not registered: {0}")]
	CustomResolverNotRegistered(&'static str),
	#[error("duplicate model name: {0}")]
	DuplicateModel(String),
}

/// Errors surfaced by services and resolvers.
///
/// Storage and authorization failures are carried verbatim; the core adds no
/// wrapping beyond choosing the variant.
#[derive(Debug, thiserror::Error)]
pub enum CrudError {
	#[error("{0}")]
	Storage(String),
	#[error("{0}")]
	NotFound(String),
	#[error("{0}")]
	Authorization(String),
	#[error("missing authorization context")]
	MissingAbility,
	#[error("invalid argument '{argument}': {message}")]
	InvalidArgument { argument: String, message: String },
	#[error(transparent)]
	Serialization(#[from] serde_json::Error),
	#[error(transparent)]
	Dependency(#[from] DiError),
	#[error(transparent)]
	Config(#[from] ConfigError),
}

pub type CrudResult<T> = Result<T, CrudError>;

impl CrudError {
	pub fn storage(message: impl Into<String>) -> Self {
		Self::Storage(message.into())
	}

	pub fn invalid_argument(argument: impl Into<String>, message: impl ToString) -> Self {
		Self::InvalidArgument {
			argument: argument.into(),
			message: message.to_string(),
		}
	}

	/// Machine-readable code attached to GraphQL error extensions.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Storage(_) => "STORAGE_ERROR",
			Self::NotFound(_) => "NOT_FOUND",
			Self::Authorization(_) => "FORBIDDEN",
			Self::MissingAbility => "UNAUTHENTICATED",
			Self::InvalidArgument { .. } | Self::Serialization(_) => "BAD_USER_INPUT",
			Self::Dependency(_) | Self::Config(_) => "INTERNAL",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_storage_message_is_passed_through() {
		let err = CrudError::storage("unique constraint failed on `email`");

		assert_eq!(err.to_string(), "unique constraint failed on `email`");
		assert_eq!(err.code(), "STORAGE_ERROR");
	}

	#[rstest]
	fn test_config_error_message() {
		let err = CrudError::from(ConfigError::CustomResolverNotRegistered("UserStats"));

		assert!(err.to_string().contains("custom resolver class not registered"));
		assert_eq!(err.code(), "INTERNAL");
	}
}
