//! The request pipeline dispatcher.
//!
//! A [`Pipeline`] pairs a frozen [`HookRegistry`] with the server logger.
//! Binding a handler through it yields a [`MethodDispatcher`]: the per-method
//! function the transport calls for each inbound message.
//!
//! Each call walks the phases in order:
//!
//! ```text
//! Start -> PreHooks -> Rejected(pre-hook error)
//!                   -> Handler -> PostResponseHooks -> Completed(response | post-hook error)
//!                              -> PostErrorHooks    -> Completed(handler error)
//! ```
//!
//! Every step is awaited before the next one starts. A failing step ends its
//! phase; panics are caught and treated as failures of the step that raised
//! them, whether they happen while the step's future is built or while it is
//! polled, so the completion sink fires exactly once.

use crate::registry::HookRegistry;
use futures::{FutureExt, channel::oneshot};
use sipahi_core::{
    BoxError, CallContext, CallError, DynHandler, ErrorContext, Handler, HookError, Logger,
    Metadata, ResponseContext, SharedError, Value,
};
use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc};

/// The outcome delivered to a completion sink.
pub type Outcome = Result<Value, CallError>;

/// The transport callback that finalizes one inbound call.
///
/// Consumed on use, so it can fire at most once.
pub struct CompletionSink {
    complete: Box<dyn FnOnce(Outcome) + Send>,
}

impl CompletionSink {
    /// Wrap a completion callback.
    pub fn new<F>(complete: F) -> Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Self {
            complete: Box::new(complete),
        }
    }

    /// A sink that forwards the outcome to a oneshot receiver.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self::new(move |outcome| {
            // The caller may have stopped waiting.
            let _ = tx.send(outcome);
        });
        (sink, rx)
    }

    /// Deliver the outcome.
    pub fn complete(self, outcome: Outcome) {
        (self.complete)(outcome)
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSink").finish_non_exhaustive()
    }
}

/// One inbound call as handed over by the transport.
#[derive(Debug)]
pub struct InboundCall {
    /// The request payload.
    pub request: Value,
    /// The call metadata.
    pub metadata: Metadata,
    /// Where the outcome goes.
    pub complete: CompletionSink,
}

impl InboundCall {
    /// Create an inbound call.
    pub fn new(request: Value, metadata: Metadata, complete: CompletionSink) -> Self {
        Self {
            request,
            metadata,
            complete,
        }
    }
}

/// Binds handlers to the shared hook registry.
#[derive(Debug, Clone)]
pub struct Pipeline {
    hooks: Arc<HookRegistry>,
    logger: Logger,
}

impl Pipeline {
    /// Create a pipeline over a frozen registry.
    pub fn new(hooks: Arc<HookRegistry>, logger: Logger) -> Self {
        Self { hooks, logger }
    }

    /// Wrap `handler` so every call to `method` runs through the hook phases.
    pub fn bind<H: Handler>(&self, method: impl Into<Arc<str>>, handler: H) -> MethodDispatcher {
        self.bind_dyn(method, Arc::new(handler))
    }

    /// Like [`bind`](Self::bind), for an already type-erased handler.
    pub fn bind_dyn(
        &self,
        method: impl Into<Arc<str>>,
        handler: Arc<dyn DynHandler>,
    ) -> MethodDispatcher {
        MethodDispatcher {
            method: method.into(),
            handler,
            hooks: Arc::clone(&self.hooks),
            logger: self.logger.clone(),
        }
    }

    /// The shared registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// The shared logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// The dispatch function for one bound method.
///
/// Cheap to clone; clones share the handler and registry.
#[derive(Clone)]
pub struct MethodDispatcher {
    method: Arc<str>,
    handler: Arc<dyn DynHandler>,
    hooks: Arc<HookRegistry>,
    logger: Logger,
}

impl MethodDispatcher {
    /// The bound method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Handle one inbound call and deliver its outcome to the completion sink.
    pub async fn dispatch(&self, call: InboundCall) {
        let InboundCall {
            request,
            metadata,
            complete,
        } = call;
        let outcome = self.run(request, metadata).await;
        complete.complete(outcome);
    }

    /// Run the full pipeline for one call and return its outcome.
    pub async fn run(&self, request: Value, metadata: Metadata) -> Outcome {
        let ctx = CallContext::new(request, metadata, self.logger.clone());

        if let Err(error) = self.pre_request(&ctx).await {
            self.logger.debug(format_args!(
                "{}: call rejected by pre-request hook: {error}",
                self.method
            ));
            return Err(CallError::PreRequest(error));
        }

        match guarded(|| self.handler.call_dyn(ctx.clone())).await {
            Ok(response) => self.post_response(&ctx, response).await,
            Err(error) => Err(self.post_error(error).await),
        }
    }

    async fn pre_request(&self, ctx: &CallContext) -> Result<(), SharedError> {
        for hook in self.hooks.request_hooks() {
            guarded(|| hook.on_request_dyn(ctx)).await?;
        }
        Ok(())
    }

    async fn post_response(&self, call: &CallContext, response: Value) -> Outcome {
        let ctx = ResponseContext::new(call, response);
        for hook in self.hooks.response_hooks() {
            if let Err(error) = guarded(|| hook.on_response_dyn(&ctx)).await {
                self.logger.debug(format_args!(
                    "{}: response discarded by post-response hook: {error}",
                    self.method
                ));
                return Err(CallError::PostResponse(error));
            }
        }
        Ok(ctx.into_response())
    }

    async fn post_error(&self, error: SharedError) -> CallError {
        let ctx = ErrorContext::new(Arc::clone(&self.method), Arc::clone(&error), self.logger.clone());
        for hook in self.hooks.error_hooks() {
            if let Err(hook_error) = guarded(|| hook.on_error_dyn(&ctx)).await {
                self.logger
                    .warn(format_args!("error hook failed for {}: {hook_error}", self.method));
                break;
            }
        }
        CallError::Handler(error)
    }
}

impl fmt::Debug for MethodDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDispatcher")
            .field("method", &self.method)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Build and await one step, turning both errors and panics into a shared error.
///
/// The step is started inside the unwind guard: hooks and handlers written as
/// plain closures run their body when called, not when polled.
async fn guarded<T, F, Fut>(step: F) -> Result<T, SharedError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    match AssertUnwindSafe(async move { step().await })
        .catch_unwind()
        .await
    {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(SharedError::from(error)),
        Err(payload) => {
            let error: SharedError = Arc::new(HookError::Panic(panic_message(payload.as_ref())));
            Err(error)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::HookRegistryBuilder,
        testing::{CountingHandler, EventLog, FailingHook, RecordingHook},
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Level, span, subscriber::Interest};

    fn pipeline(builder: HookRegistryBuilder) -> Pipeline {
        Pipeline::new(Arc::new(builder.build()), Logger::disabled())
    }

    #[tokio::test]
    async fn test_identity_without_hooks() {
        let dispatcher = pipeline(HookRegistryBuilder::new()).bind("Echo", CountingHandler::echo());
        let out = dispatcher.run(json!({"msg": "hi"}), Metadata::new()).await.unwrap();
        assert_eq!(out, json!({"msg": "hi"}));
        assert_eq!(dispatcher.method(), "Echo");
    }

    #[tokio::test]
    async fn test_phase_order() {
        let log = EventLog::new();
        let builder = HookRegistryBuilder::new()
            .on_request(RecordingHook::new("a", &log))
            .on_response(RecordingHook::new("c", &log))
            .on_request(RecordingHook::new("b", &log))
            .on_error(RecordingHook::new("e", &log));

        pipeline(builder)
            .bind("Echo", CountingHandler::echo())
            .run(json!(1), Metadata::new())
            .await
            .unwrap();

        assert_eq!(log.entries(), ["a:onRequest", "b:onRequest", "c:onResponse"]);
    }

    #[tokio::test]
    async fn test_pre_request_failure_short_circuits() {
        let log = EventLog::new();
        let handler = CountingHandler::echo();
        let failing = FailingHook::new("denied");
        let builder = HookRegistryBuilder::new()
            .on_request(failing.clone())
            .on_request(RecordingHook::new("after", &log))
            .on_error(RecordingHook::new("err", &log));

        let err = pipeline(builder)
            .bind("Echo", handler.clone())
            .run(json!(1), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::PreRequest(_)));
        assert_eq!(err.to_string(), "denied");
        assert_eq!(handler.count(), 0);
        assert_eq!(failing.count(), 1);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_post_response_failure_discards_response() {
        let log = EventLog::new();
        let builder = HookRegistryBuilder::new()
            .on_response(FailingHook::new("audit unavailable"))
            .on_response(RecordingHook::new("never", &log));

        let err = pipeline(builder)
            .bind("Echo", CountingHandler::echo())
            .run(json!({"secret": 1}), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::PostResponse(_)));
        assert_eq!(err.to_string(), "audit unavailable");
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_error_hook_failure_does_not_mask_handler_error() {
        let log = EventLog::new();
        let recorder = RecordingHook::new("seen", &log);
        let builder = HookRegistryBuilder::new()
            .on_error(recorder.clone())
            .on_error(FailingHook::new("alerting down"))
            .on_error(RecordingHook::new("skipped", &log));

        let err = pipeline(builder)
            .bind("Fail", CountingHandler::failing("boom"))
            .run(json!(null), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::Handler(_)));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(recorder.errors(), ["Fail: boom"]);
        assert_eq!(log.entries(), ["seen:onError"]);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_normalized() {
        let handler = |_ctx: CallContext| async move {
            if true {
                panic!("handler exploded");
            }
            Ok::<Value, BoxError>(Value::Null)
        };

        let err = pipeline(HookRegistryBuilder::new())
            .bind("Boom", handler)
            .run(json!(null), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::Handler(_)));
        assert!(matches!(
            err.find_source::<HookError>(),
            Some(HookError::Panic(message)) if message == "handler exploded"
        ));
    }

    #[tokio::test]
    async fn test_request_hook_panicking_when_called_is_caught() {
        let handler = CountingHandler::echo();
        let hook = |_ctx: CallContext| -> std::future::Ready<Result<(), BoxError>> {
            panic!("hook exploded")
        };
        let dispatcher =
            pipeline(HookRegistryBuilder::new().on_request(hook)).bind("Echo", handler.clone());

        let (sink, rx) = CompletionSink::channel();
        dispatcher
            .dispatch(InboundCall::new(json!(1), Metadata::new(), sink))
            .await;

        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, CallError::PreRequest(_)));
        assert!(matches!(
            err.find_source::<HookError>(),
            Some(HookError::Panic(message)) if message == "hook exploded"
        ));
        assert_eq!(handler.count(), 0);
    }

    #[tokio::test]
    async fn test_handler_panicking_when_called_reaches_error_hooks() {
        let log = EventLog::new();
        let recorder = RecordingHook::new("log", &log);
        let handler = |_ctx: CallContext| -> std::future::Ready<Result<Value, BoxError>> {
            panic!("handler exploded early")
        };

        let err = pipeline(HookRegistryBuilder::new().on_error(recorder.clone()))
            .bind("Boom", handler)
            .run(json!(null), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::Handler(_)));
        assert!(matches!(err.find_source::<HookError>(), Some(HookError::Panic(_))));
        assert_eq!(recorder.errors(), ["Boom: panicked: handler exploded early"]);
    }

    #[tokio::test]
    async fn test_response_hook_panicking_when_polled_is_caught() {
        let log = EventLog::new();
        let hook = |_ctx: ResponseContext| async move {
            if true {
                panic!("audit exploded");
            }
            Ok::<(), BoxError>(())
        };
        let builder = HookRegistryBuilder::new()
            .on_response(hook)
            .on_response(RecordingHook::new("never", &log));

        let err = pipeline(builder)
            .bind("Echo", CountingHandler::echo())
            .run(json!({"secret": 1}), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::PostResponse(_)));
        assert!(matches!(
            err.find_source::<HookError>(),
            Some(HookError::Panic(message)) if message == "audit exploded"
        ));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_error_hook_panic_does_not_mask_handler_error() {
        let log = EventLog::new();
        let hook = |_ctx: ErrorContext| -> std::future::Ready<Result<(), BoxError>> {
            panic!("alerting exploded")
        };
        let builder = HookRegistryBuilder::new()
            .on_error(hook)
            .on_error(RecordingHook::new("skipped", &log));

        let err = pipeline(builder)
            .bind("Fail", CountingHandler::failing("boom"))
            .run(json!(null), Metadata::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::Handler(_)));
        assert_eq!(err.to_string(), "boom");
        assert!(err.find_source::<HookError>().is_none());
        assert!(log.is_empty());
    }

    #[derive(Clone, Default)]
    struct EventCounter(Arc<AtomicUsize>);

    impl EventCounter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl tracing::Subscriber for EventCounter {
        fn register_callsite(&self, _: &'static tracing::Metadata<'static>) -> Interest {
            Interest::sometimes()
        }

        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }

        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}

        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}

        fn event(&self, _: &tracing::Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn enter(&self, _: &span::Id) {}

        fn exit(&self, _: &span::Id) {}
    }

    #[tokio::test]
    async fn test_disabled_logger_keeps_dispatch_silent() {
        let counter = EventCounter::default();
        let _guard = tracing::subscriber::set_default(counter.clone());
        let rejecting = || HookRegistryBuilder::new().on_request(FailingHook::new("denied"));

        Pipeline::new(Arc::new(rejecting().build()), Logger::disabled())
            .bind("Echo", CountingHandler::echo())
            .run(json!(1), Metadata::new())
            .await
            .unwrap_err();
        assert_eq!(counter.count(), 0);

        let logger = Logger::new("svc").with_level(Level::DEBUG);
        Pipeline::new(Arc::new(rejecting().build()), logger)
            .bind("Echo", CountingHandler::echo())
            .run(json!(1), Metadata::new())
            .await
            .unwrap_err();
        assert!(counter.count() > 0);
    }

    #[tokio::test]
    async fn test_dispatch_completes_once() {
        let dispatcher = pipeline(HookRegistryBuilder::new().on_request(FailingHook::new("no")))
            .bind("Echo", CountingHandler::echo());

        let (sink, rx) = CompletionSink::channel();
        dispatcher
            .dispatch(InboundCall::new(json!(1), Metadata::new(), sink))
            .await;

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap_err().to_string(), "no");
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let dispatcher = pipeline(HookRegistryBuilder::new()).bind("Echo", CountingHandler::echo());

        let (a, b) = futures::join!(
            dispatcher.run(json!("a"), Metadata::new()),
            dispatcher.run(json!("b"), Metadata::new()),
        );
        assert_eq!(a.unwrap(), json!("a"));
        assert_eq!(b.unwrap(), json!("b"));
    }
}
