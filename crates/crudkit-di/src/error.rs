//! Dependency injection errors

/// Errors raised while registering or resolving dependencies.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
	/// No value of the requested type is visible from the context.
	#[error("Dependency not found: {0}")]
	NotFound(String),
	/// A stored value could not be downcast to the requested type.
	#[error("Type mismatch for dependency: {0}")]
	TypeMismatch(String),
	/// A provider factory failed.
	#[error("Provider '{provider}' failed: {message}")]
	Provider { provider: String, message: String },
	#[error("Internal DI error: {message}")]
	Internal { message: String },
}

pub type DiResult<T> = Result<T, DiError>;

impl DiError {
	/// Shorthand for a missing dependency of type `T`.
	pub fn not_found<T: ?Sized>() -> Self {
		Self::NotFound(std::any::type_name::<T>().to_string())
	}
}
