//! Dependency scopes

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type ErasedMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Application-wide cache keyed by type.
///
/// Each crudkit module owns one of these; entries copied in from imported
/// modules share the same `Arc`, so a singleton is constructed only once.
pub struct SingletonScope {
	cache: Arc<RwLock<ErasedMap>>,
}

impl SingletonScope {
	/// Creates a new SingletonScope with an empty cache.
	///
	/// # Examples
	///
	/// ```
	/// use crudkit_di::SingletonScope;
	///
	/// let scope = SingletonScope::new();
	/// scope.set(100u64);
	/// assert_eq!(*scope.get::<u64>().unwrap(), 100);
	/// ```
	pub fn new() -> Self {
		Self {
			cache: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Retrieves a singleton value from the cache by type.
	pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.get_erased(TypeId::of::<T>())
			.and_then(|arc| arc.downcast::<T>().ok())
	}

	/// Stores a singleton value in the cache.
	pub fn set<T: Any + Send + Sync>(&self, value: T) {
		self.set_arc(Arc::new(value));
	}

	/// Stores a pre-wrapped `Arc<T>` in the singleton scope cache.
	pub fn set_arc<T: Any + Send + Sync>(&self, value: Arc<T>) {
		self.set_erased(TypeId::of::<T>(), value);
	}

	/// Retrieves a type-erased entry.
	pub fn get_erased(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
		let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
		cache.get(&type_id).cloned()
	}

	/// Stores a type-erased entry, replacing any previous value for `type_id`.
	pub fn set_erased(&self, type_id: TypeId, value: Arc<dyn Any + Send + Sync>) {
		let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
		cache.insert(type_id, value);
	}

	pub fn contains(&self, type_id: TypeId) -> bool {
		let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
		cache.contains_key(&type_id)
	}

	pub fn len(&self) -> usize {
		self.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for SingletonScope {
	fn default() -> Self {
		Self::new()
	}
}
