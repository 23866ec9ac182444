//! Injectable trait for dependencies

use crate::{DiResult, context::InjectionContext};

/// Injectable trait for dependencies.
///
/// Types implementing this trait can be constructed by a module container
/// from the dependencies visible in its [`InjectionContext`]. crudkit uses it
/// for CRUD services and subscription resolvers, which pull the shared storage
/// and pub/sub handles registered by the root module.
///
/// # Example
///
/// ```rust
/// use crudkit_di::{DiResult, Injectable, InjectionContext};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Greeter {
///     greeting: Arc<String>,
/// }
///
/// #[async_trait]
/// impl Injectable for Greeter {
///     async fn inject(ctx: &InjectionContext) -> DiResult<Self> {
///         Ok(Greeter {
///             greeting: ctx.resolve::<String>()?,
///         })
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Injectable: Sized + Send + Sync + 'static {
	async fn inject(ctx: &InjectionContext) -> DiResult<Self>;
}

/// Blanket implementation of Injectable for `Arc<T>`
///
/// The implementation injects `T` first, then wraps it in `Arc`.
#[async_trait::async_trait]
impl<T> Injectable for std::sync::Arc<T>
where
	T: Injectable,
{
	async fn inject(ctx: &InjectionContext) -> DiResult<Self> {
		T::inject(ctx).await.map(std::sync::Arc::new)
	}
}
