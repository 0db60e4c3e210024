//! # Lifecycle hooks
//!
//! Hooks are user-supplied functions invoked at a fixed point in the request
//! lifecycle. They are not request handlers: they observe the call, may
//! perform side effects, and may fail.
//!
//! Each phase has its own trait because each sees a different context:
//!
//! - [`RequestHook`] - before the handler, with the [`CallContext`]
//! - [`ResponseHook`] - after a successful handler, with the [`ResponseContext`]
//! - [`ErrorHook`] - after a failed handler, with the [`ErrorContext`]
//!
//! # Static vs Dynamic Dispatch
//!
//! The phase traits use native `async fn` for static dispatch. Registries
//! store the object-safe `Dyn*` counterparts, which every hook implements
//! through a blanket impl.
//!
//! Closures taking the context by value implement the matching trait, so
//! `|ctx: CallContext| async move { ... }` is a valid pre-request hook.

use crate::{
    context::{CallContext, ErrorContext, ResponseContext},
    error::BoxError,
};
use futures::future::BoxFuture;
use std::future::Future;

/// A hook run before the handler.
///
/// Returning an error rejects the call: later hooks and the handler do not run.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a pre-request hook",
    label = "missing `RequestHook` implementation",
    note = "Implement `RequestHook` or pass a closure `Fn(CallContext) -> impl Future<Output = Result<(), BoxError>>`."
)]
pub trait RequestHook: Send + Sync + 'static {
    /// Called for every inbound call before the handler.
    fn on_request(&self, ctx: &CallContext) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// A hook run after the handler succeeded.
///
/// Returning an error turns the call into a failure and discards the response.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a post-response hook",
    label = "missing `ResponseHook` implementation",
    note = "Implement `ResponseHook` or pass a closure `Fn(ResponseContext) -> impl Future<Output = Result<(), BoxError>>`."
)]
pub trait ResponseHook: Send + Sync + 'static {
    /// Called with the handler's response.
    fn on_response(
        &self,
        ctx: &ResponseContext,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// A hook run after the handler failed.
///
/// The caller always receives the handler's error; a failure here is only logged.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a post-error hook",
    label = "missing `ErrorHook` implementation",
    note = "Implement `ErrorHook` or pass a closure `Fn(ErrorContext) -> impl Future<Output = Result<(), BoxError>>`."
)]
pub trait ErrorHook: Send + Sync + 'static {
    /// Called with the handler's error.
    fn on_error(&self, ctx: &ErrorContext) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Object-safe version of [`RequestHook`].
pub trait DynRequestHook: Send + Sync + 'static {
    /// Dynamic dispatch version of [`RequestHook::on_request`].
    fn on_request_dyn<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// Object-safe version of [`ResponseHook`].
pub trait DynResponseHook: Send + Sync + 'static {
    /// Dynamic dispatch version of [`ResponseHook::on_response`].
    fn on_response_dyn<'a>(
        &'a self,
        ctx: &'a ResponseContext,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// Object-safe version of [`ErrorHook`].
pub trait DynErrorHook: Send + Sync + 'static {
    /// Dynamic dispatch version of [`ErrorHook::on_error`].
    fn on_error_dyn<'a>(&'a self, ctx: &'a ErrorContext) -> BoxFuture<'a, Result<(), BoxError>>;
}

// Blanket implementations: every hook is usable behind `dyn`.
impl<T: RequestHook> DynRequestHook for T {
    fn on_request_dyn<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.on_request(ctx))
    }
}

impl<T: ResponseHook> DynResponseHook for T {
    fn on_response_dyn<'a>(
        &'a self,
        ctx: &'a ResponseContext,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.on_response(ctx))
    }
}

impl<T: ErrorHook> DynErrorHook for T {
    fn on_error_dyn<'a>(&'a self, ctx: &'a ErrorContext) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.on_error(ctx))
    }
}

// Closures receive an owned clone of the context.
impl<F, Fut> RequestHook for F
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn on_request(&self, ctx: &CallContext) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(ctx.clone())
    }
}

impl<F, Fut> ResponseHook for F
where
    F: Fn(ResponseContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn on_response(
        &self,
        ctx: &ResponseContext,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(ctx.clone())
    }
}

impl<F, Fut> ErrorHook for F
where
    F: Fn(ErrorContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn on_error(&self, ctx: &ErrorContext) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(ctx.clone())
    }
}
