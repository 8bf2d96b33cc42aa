//! # Provider abstraction and function-backed implementation.
//!
//! This module defines the [`Provider`] trait (async, cancelable) and a
//! convenient function-backed implementation [`ProviderFn`]. The common
//! handle type is [`ProviderRef`], an `Arc<dyn Provider>` suitable for
//! sharing across the runtime.
//!
//! A provider receives the opaque [`TaskPayload`] and a
//! [`CancellationToken`]; it should periodically check the token to stop
//! cooperatively when the request is cancelled. The dispatcher never
//! interprets the payload or the returned value.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::requests::TaskPayload;

/// Shared handle to a provider.
pub type ProviderRef = Arc<dyn Provider>;

/// # Asynchronous, cancelable execution backend.
///
/// A `Provider` has a stable [`name`](Provider::name), an advertised
/// [`cost_per_request`](Provider::cost_per_request), and an async
/// [`execute`](Provider::execute) method. Implementors should regularly check
/// the cancellation token and exit promptly when it fires.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use tokio_util::sync::CancellationToken;
/// use taskrouter::{Provider, ProviderError, TaskPayload};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Provider for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn execute(
///         &self,
///         payload: &TaskPayload,
///         ctx: CancellationToken,
///     ) -> Result<Value, ProviderError> {
///         if ctx.is_cancelled() {
///             return Err(ProviderError::Canceled);
///         }
///         Ok(json!({ "echoed": payload.input() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Returns a stable, human-readable provider name.
    fn name(&self) -> &str;

    /// Estimated cost per request, used by the cost-optimized strategy.
    fn cost_per_request(&self) -> f64 {
        0.0
    }

    /// Executes one request until completion or cancellation.
    ///
    /// Implementations should check `ctx.is_cancelled()` at suspension points
    /// and return [`ProviderError::Canceled`] to honor cooperative
    /// cancellation.
    async fn execute(
        &self,
        payload: &TaskPayload,
        ctx: CancellationToken,
    ) -> Result<Value, ProviderError>;
}

/// Function-backed provider implementation.
///
/// Wraps a closure that *creates* a new future per call, so there is no
/// hidden shared state between attempts; if shared state is needed, move an
/// `Arc<...>` into the closure explicitly.
///
/// ## Example
/// ```
/// use serde_json::{json, Value};
/// use tokio_util::sync::CancellationToken;
/// use taskrouter::{Provider, ProviderError, ProviderFn, ProviderRef, TaskPayload};
///
/// let p: ProviderRef = ProviderFn::arc("local", |payload: TaskPayload, _ctx| async move {
///     Ok::<Value, ProviderError>(json!({ "task": payload.task() }))
/// });
///
/// assert_eq!(p.name(), "local");
/// ```
pub struct ProviderFn<F> {
    name: Cow<'static, str>,
    cost: f64,
    f: F,
}

impl<F> ProviderFn<F> {
    /// Creates a new function-backed provider.
    ///
    /// Prefer [`ProviderFn::arc`] when you immediately need a [`ProviderRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            cost: 0.0,
            f,
        }
    }

    /// Sets the advertised cost per request.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Creates the provider and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Provider for ProviderFn<F>
where
    F: Fn(TaskPayload, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ProviderError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_per_request(&self) -> f64 {
        self.cost
    }

    async fn execute(
        &self,
        payload: &TaskPayload,
        ctx: CancellationToken,
    ) -> Result<Value, ProviderError> {
        (self.f)(payload.clone(), ctx).await
    }
}
