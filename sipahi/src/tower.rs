//! Tower integration for sipahi.
//!
//! This module provides adapters in both directions between sipahi's
//! dispatch pipeline and tower's `Service` trait.
//!
//! - [`DispatchService`]: a bound method, hooks included, as a tower `Service`
//! - [`ServiceHandler`]: a tower `Service` as a sipahi [`Handler`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sipahi::tower::{CallRequest, DispatchService};
//!
//! let service = DispatchService::new(pipeline.bind("SayHello", say_hello));
//! let with_timeout = tower::timeout::Timeout::new(service, Duration::from_secs(5));
//! ```

use futures::future::BoxFuture;
use sipahi_core::{BoxError, CallContext, CallError, Handler, Metadata, Value};
use sipahi_std::{MethodDispatcher, Outcome};
use std::{
    future::poll_fn,
    task::{Context, Poll},
};
use tower::Service;

// ============================================================================
// Dispatcher → Service Adapter
// ============================================================================

/// A request for a [`DispatchService`].
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// The request payload.
    pub request: Value,
    /// Caller metadata.
    pub metadata: Metadata,
}

impl CallRequest {
    /// A request without metadata.
    pub fn new(request: Value) -> Self {
        Self {
            request,
            metadata: Metadata::new(),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Wraps a [`MethodDispatcher`] as a tower `Service`.
///
/// Each call runs the full hook pipeline, exactly as a transport would.
#[derive(Debug, Clone)]
pub struct DispatchService {
    dispatcher: MethodDispatcher,
}

impl DispatchService {
    /// Create a new `DispatchService`.
    pub fn new(dispatcher: MethodDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Get a reference to the inner dispatcher.
    pub fn inner(&self) -> &MethodDispatcher {
        &self.dispatcher
    }
}

impl Service<CallRequest> for DispatchService {
    type Response = Value;
    type Error = CallError;
    type Future = BoxFuture<'static, Outcome>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Dispatchers are always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CallRequest) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        Box::pin(async move { dispatcher.run(req.request, req.metadata).await })
    }
}

// ============================================================================
// Service → Handler Adapter
// ============================================================================

/// Wraps a tower `Service` as a sipahi [`Handler`].
///
/// The service is cloned per call and driven to readiness before use.
#[derive(Debug, Clone)]
pub struct ServiceHandler<S> {
    service: S,
}

impl<S> ServiceHandler<S> {
    /// Create a new `ServiceHandler`.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Get a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.service
    }
}

impl<S> Handler for ServiceHandler<S>
where
    S: Service<CallContext, Response = Value, Error = BoxError> + Clone + Send + Sync + 'static,
    S::Future: Send,
{
    async fn call(&self, ctx: CallContext) -> Result<Value, BoxError> {
        let mut service = self.service.clone();
        poll_fn(|cx| service.poll_ready(cx)).await?;
        service.call(ctx).await
    }
}

// ============================================================================
// Tests
// ============================================================================
