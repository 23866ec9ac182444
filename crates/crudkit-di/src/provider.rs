//! Dependency providers
//!
//! A [`Provider`] is a named async factory that installs one value, keyed by
//! its type, into a module's singleton scope. Modules publish a subset of
//! their providers to importers through [`Export`] entries.

use crate::{DiError, DiResult, Injectable, InjectionContext};
use std::any::{Any, TypeId};
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for the complex provider future type
type ProviderFutureInner = Pin<Box<dyn Future<Output = DiResult<Arc<dyn Any + Send + Sync>>> + Send>>;

/// Wrapper type for the future returned by providers
pub struct ProviderFuture(ProviderFutureInner);

impl ProviderFuture {
	pub fn new(future: ProviderFutureInner) -> Self {
		Self(future)
	}

	pub fn into_inner(self) -> ProviderFutureInner {
		self.0
	}
}

impl From<ProviderFutureInner> for ProviderFuture {
	fn from(future: ProviderFutureInner) -> Self {
		Self::new(future)
	}
}

type ProviderFnInner = Arc<dyn Fn(Arc<InjectionContext>) -> ProviderFuture + Send + Sync>;

/// Wrapper type for provider functions
#[derive(Clone)]
pub struct ProviderFn(ProviderFnInner);

impl ProviderFn {
	pub fn new(func: ProviderFnInner) -> Self {
		Self(func)
	}
}

impl Deref for ProviderFn {
	type Target = ProviderFnInner;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// A named registration for one dependency type.
///
/// # Examples
///
/// ```
/// use crudkit_di::{InjectionContext, Provider, SingletonScope};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = Arc::new(InjectionContext::builder(Arc::new(SingletonScope::new())).build());
/// Provider::value(42u32).install(&ctx).await.unwrap();
///
/// assert_eq!(*ctx.resolve::<u32>().unwrap(), 42);
/// # }
/// ```
#[derive(Clone)]
pub struct Provider {
	name: &'static str,
	type_id: TypeId,
	factory: ProviderFn,
}

impl Provider {
	/// Registers an already constructed value.
	pub fn value<T: Any + Send + Sync>(value: T) -> Self {
		Self::shared(Arc::new(value))
	}

	/// Registers a value that is already behind an `Arc`, keeping pointer identity.
	pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self {
			name: std::any::type_name::<T>(),
			type_id: TypeId::of::<T>(),
			factory: ProviderFn::new(Arc::new(move |_ctx| {
				let value = value.clone() as Arc<dyn Any + Send + Sync>;
				ProviderFuture::new(Box::pin(async move { Ok(value) }))
			})),
		}
	}

	/// Registers an async factory that can resolve its own dependencies.
	pub fn factory<T, F, Fut>(factory: F) -> Self
	where
		T: Any + Send + Sync,
		F: Fn(Arc<InjectionContext>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		Self {
			name: std::any::type_name::<T>(),
			type_id: TypeId::of::<T>(),
			factory: ProviderFn::new(Arc::new(move |ctx| {
				let fut = factory(ctx);
				ProviderFuture::new(Box::pin(async move {
					let value = fut.await?;
					Ok(Arc::new(value) as Arc<dyn Any + Send + Sync>)
				}))
			})),
		}
	}

	/// Registers `T` constructed through its [`Injectable`] implementation.
	pub fn injectable<T: Injectable>() -> Self {
		Self::factory(|ctx: Arc<InjectionContext>| async move { T::inject(&ctx).await })
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	/// Runs the factory and stores the result in the context's singleton scope.
	pub async fn install(&self, ctx: &Arc<InjectionContext>) -> DiResult<()> {
		let value = (self.factory.0)(ctx.clone())
			.into_inner()
			.await
			.map_err(|e| DiError::Provider {
				provider: self.name.to_string(),
				message: e.to_string(),
			})?;
		if (*value).type_id() != self.type_id {
			return Err(DiError::TypeMismatch(self.name.to_string()));
		}
		ctx.singleton_scope().set_erased(self.type_id, value);
		tracing::debug!(module = %ctx.name(), provider = self.name, "provider installed");
		Ok(())
	}
}

impl std::fmt::Debug for Provider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Provider").field("name", &self.name).finish()
	}
}

/// A type a module makes visible to the modules importing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Export {
	name: &'static str,
	type_id: TypeId,
}

impl Export {
	pub fn of<T: Any + Send + Sync>() -> Self {
		Self {
			name: std::any::type_name::<T>(),
			type_id: TypeId::of::<T>(),
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}
}

impl From<&Provider> for Export {
	fn from(provider: &Provider) -> Self {
		Self {
			name: provider.name,
			type_id: provider.type_id,
		}
	}
}
