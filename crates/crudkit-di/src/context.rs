//! Injection context for dependency resolution

use crate::scope::SingletonScope;
use crate::{DiError, DiResult};
use std::any::Any;
use std::sync::Arc;

pub struct InjectionContext {
	name: String,
	singleton_scope: Arc<SingletonScope>,
}

impl InjectionContext {
	/// Starts building a context around a shared singleton scope.
	///
	/// # Examples
	///
	/// ```
	/// use crudkit_di::{InjectionContext, SingletonScope};
	/// use std::sync::Arc;
	///
	/// let singleton = Arc::new(SingletonScope::new());
	/// let ctx = InjectionContext::builder(singleton).build();
	/// assert_eq!(ctx.name(), "root");
	/// ```
	pub fn builder(singleton_scope: Arc<SingletonScope>) -> InjectionContextBuilder {
		InjectionContextBuilder {
			name: None,
			singleton_scope,
		}
	}

	/// Name of the module owning this context, used in diagnostics.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn singleton_scope(&self) -> &Arc<SingletonScope> {
		&self.singleton_scope
	}

	pub fn get_singleton<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.singleton_scope.get::<T>()
	}

	pub fn set_singleton<T: Any + Send + Sync>(&self, value: T) {
		self.singleton_scope.set(value);
	}

	/// Resolves `T` from the module's singleton scope.
	///
	/// # Examples
	///
	/// ```
	/// use crudkit_di::{InjectionContext, SingletonScope};
	/// use std::sync::Arc;
	///
	/// let singleton = Arc::new(SingletonScope::new());
	/// singleton.set(7u8);
	/// let ctx = InjectionContext::builder(singleton).build();
	///
	/// assert_eq!(*ctx.resolve::<u8>().unwrap(), 7);
	/// assert!(ctx.resolve::<u16>().is_err());
	/// ```
	pub fn resolve<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
		self.get_singleton::<T>()
			.ok_or_else(|| {
				tracing::debug!(
					module = %self.name,
					dependency = std::any::type_name::<T>(),
					"dependency not registered"
				);
				DiError::not_found::<T>()
			})
	}

	/// Resolves `T` and clones it out of its `Arc`.
	///
	/// Handy for handles that are themselves shared pointers, such as
	/// `Arc<dyn Trait>` registrations.
	pub fn resolve_cloned<T: Any + Send + Sync + Clone>(&self) -> DiResult<T> {
		self.resolve::<T>().map(|arc| (*arc).clone())
	}
}

pub struct InjectionContextBuilder {
	name: Option<String>,
	singleton_scope: Arc<SingletonScope>,
}

impl InjectionContextBuilder {
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn build(self) -> InjectionContext {
		InjectionContext {
			name: self.name.unwrap_or_else(|| "root".to_string()),
			singleton_scope: self.singleton_scope,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_set_singleton_is_visible_through_shared_scope() {
		let singleton = Arc::new(SingletonScope::new());
		let ctx = InjectionContext::builder(singleton.clone()).name("test").build();

		ctx.set_singleton(2i64);

		assert_eq!(*ctx.resolve::<i64>().unwrap(), 2);
		assert_eq!(*singleton.get::<i64>().unwrap(), 2);
	}

	#[rstest]
	fn test_resolve_missing_reports_type_name() {
		let ctx = InjectionContext::builder(Arc::new(SingletonScope::new())).build();

		let err = ctx.resolve::<String>().unwrap_err();

		match err {
			DiError::NotFound(name) => assert!(name.contains("String")),
			other => panic!("Expected NotFound, got {other:?}"),
		}
	}

	#[rstest]
	fn test_resolve_cloned_shared_handle() {
		let singleton = Arc::new(SingletonScope::new());
		let handle: Arc<str> = Arc::from("handle");
		singleton.set(handle.clone());
		let ctx = InjectionContext::builder(singleton).build();

		let resolved = ctx.resolve_cloned::<Arc<str>>().unwrap();
		assert!(Arc::ptr_eq(&resolved, &handle));
	}
}
