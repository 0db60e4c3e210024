//! # Handlers
//!
//! The terminal step of the pipeline: user business logic bound to one method
//! name. A handler receives the [`CallContext`] and returns a response payload
//! or an error.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|ctx: CallContext| async move { ... }`
//! 2. **Struct implementation**: `impl Handler for MyHandler`
//! 3. **Typed messages**: `TypedHandler::new(|req: EchoRequest, ctx| async move { ... })`

use crate::{context::CallContext, error::BoxError};
use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{future::Future, marker::PhantomData};

/// The user handler bound to a method.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a method handler",
    label = "missing `Handler` implementation",
    note = "Implement `Handler` or pass a closure `Fn(CallContext) -> impl Future<Output = Result<Value, BoxError>>`."
)]
pub trait Handler: Send + Sync + 'static {
    /// Handle one call.
    fn call(&self, ctx: CallContext) -> impl Future<Output = Result<Value, BoxError>> + Send;
}

/// Object-safe version of [`Handler`].
pub trait DynHandler: Send + Sync + 'static {
    /// Dynamic dispatch version of [`Handler::call`].
    fn call_dyn(&self, ctx: CallContext) -> BoxFuture<'_, Result<Value, BoxError>>;
}

impl<T: Handler> DynHandler for T {
    fn call_dyn(&self, ctx: CallContext) -> BoxFuture<'_, Result<Value, BoxError>> {
        Box::pin(self.call(ctx))
    }
}

// Blanket impl for closures
impl<F, Fut> Handler for F
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send,
{
    fn call(&self, ctx: CallContext) -> impl Future<Output = Result<Value, BoxError>> + Send {
        (self)(ctx)
    }
}

/// Wrapper that decodes the request before calling the function and encodes
/// its response afterwards.
///
/// A request that does not decode into `Req` fails the call as a handler
/// error, so error hooks see it.
pub struct TypedHandler<F, Req, Resp, Fut> {
    func: F,
    _marker: PhantomData<fn(Req) -> (Resp, Fut)>,
}

impl<F, Req, Resp, Fut> TypedHandler<F, Req, Resp, Fut>
where
    F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    Fut: Future<Output = Result<Resp, BoxError>> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, Req, Resp, Fut> Handler for TypedHandler<F, Req, Resp, Fut>
where
    F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    Fut: Future<Output = Result<Resp, BoxError>> + Send + 'static,
{
    async fn call(&self, ctx: CallContext) -> Result<Value, BoxError> {
        let request: Req = ctx.decode()?;
        let response = (self.func)(request, ctx).await?;
        Ok(serde_json::to_value(response)?)
    }
}
