//! Testing utilities for Sipahi.
//!
//! This module provides utilities to make testing hooks, handlers and servers easier.
//!
//! # Features
//!
//! - [`EventLog`]: A shared, ordered log hooks write into
//! - [`RecordingHook`]: A hook that records every phase it runs in
//! - [`FailingHook`]: A hook that always fails and counts its calls
//! - [`CountingHandler`]: A handler that echoes or fails and counts its calls
//! - [`MemoryTransport`]: An in-process transport for end-to-end tests

use crate::{
    dispatch::{InboundCall, Outcome},
    service::{BoundAddress, MethodTable, ServiceDescriptor, Transport, TransportOptions},
};
use sipahi_core::{
    BoxError, CallContext, CallError, ErrorContext, ErrorHook, Handler, Metadata, Phase,
    RequestHook, ResponseContext, ResponseHook, Value,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Event Log
// ============================================================================

/// An ordered log shared between hooks, for asserting invocation order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    /// A snapshot of all entries.
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Check if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

// ============================================================================
// Recording Hook
// ============================================================================

/// A hook that writes `"{label}:{phase}"` to an [`EventLog`] whenever it runs.
///
/// Implements all three phase traits. As an error hook it also remembers
/// `"{method}: {error}"` for each failure it observed.
///
/// # Example
///
/// ```rust,ignore
/// let log = EventLog::new();
/// let registry = HookRegistryBuilder::new()
///     .on_request(RecordingHook::new("first", &log))
///     .on_request(RecordingHook::new("second", &log))
///     .build();
///
/// // ... dispatch a call ...
/// assert_eq!(log.entries(), ["first:onRequest", "second:onRequest"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingHook {
    label: String,
    log: EventLog,
    errors: Arc<Mutex<Vec<String>>>,
}

impl RecordingHook {
    /// Create a recording hook writing to `log`.
    pub fn new(label: impl Into<String>, log: &EventLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Errors observed in the error phase, as `"{method}: {error}"`.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    fn record(&self, phase: Phase) {
        self.log.push(format!("{}:{}", self.label, phase));
    }
}

impl RequestHook for RecordingHook {
    async fn on_request(&self, _ctx: &CallContext) -> Result<(), BoxError> {
        self.record(Phase::Request);
        Ok(())
    }
}

impl ResponseHook for RecordingHook {
    async fn on_response(&self, _ctx: &ResponseContext) -> Result<(), BoxError> {
        self.record(Phase::Response);
        Ok(())
    }
}

impl ErrorHook for RecordingHook {
    async fn on_error(&self, ctx: &ErrorContext) -> Result<(), BoxError> {
        self.record(Phase::Error);
        lock(&self.errors).push(format!("{}: {}", ctx.method(), ctx.error()));
        Ok(())
    }
}

// ============================================================================
// Failing Hook
// ============================================================================

/// A hook that fails with a fixed message in every phase.
#[derive(Debug, Clone)]
pub struct FailingHook {
    message: String,
    count: Arc<AtomicUsize>,
}

impl FailingHook {
    /// Create a hook failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times the hook ran.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Err(self.message.clone().into())
    }
}

impl RequestHook for FailingHook {
    async fn on_request(&self, _ctx: &CallContext) -> Result<(), BoxError> {
        self.fail()
    }
}

impl ResponseHook for FailingHook {
    async fn on_response(&self, _ctx: &ResponseContext) -> Result<(), BoxError> {
        self.fail()
    }
}

impl ErrorHook for FailingHook {
    async fn on_error(&self, _ctx: &ErrorContext) -> Result<(), BoxError> {
        self.fail()
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations and either echoes the request or fails.
///
/// # Example
///
/// ```rust,ignore
/// let handler = CountingHandler::echo();
/// let counter = handler.clone();
///
/// // Bind and dispatch...
///
/// assert_eq!(counter.count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
    failure: Option<String>,
}

impl CountingHandler {
    /// A handler returning the request unchanged.
    pub fn echo() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            failure: None,
        }
    }

    /// A handler always failing with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            failure: Some(message.into()),
        }
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Handler for CountingHandler {
    async fn call(&self, ctx: CallContext) -> Result<Value, BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(message.clone().into()),
            None => Ok(ctx.request().clone()),
        }
    }
}

// ============================================================================
// Memory Transport
// ============================================================================

#[derive(Default)]
struct MemoryState {
    services: HashMap<String, MethodTable>,
    address: Option<BoundAddress>,
    options: TransportOptions,
    shut_down: bool,
}

/// An in-process [`Transport`] that routes calls straight to the registered
/// method tables.
///
/// Clones share state, so keep one clone to drive calls after handing the
/// other to a server.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Create an unbound transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a call to `service`/`method` and wait for its outcome.
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        request: Value,
        metadata: Metadata,
    ) -> Outcome {
        let table = self.table(service)?;
        table.call(method, request, metadata).await
    }

    /// Route an inbound call through the transport's completion protocol.
    pub async fn dispatch(&self, service: &str, method: &str, call: InboundCall) {
        match self.table(service) {
            Ok(table) => table.dispatch(method, call).await,
            Err(err) => call.complete.complete(Err(err)),
        }
    }

    fn table(&self, service: &str) -> Result<MethodTable, CallError> {
        let state = lock(&self.state);
        if state.shut_down || state.address.is_none() {
            return Err(CallError::Unavailable(format!("{service}: transport not serving")));
        }
        state
            .services
            .get(service)
            .cloned()
            .ok_or_else(|| CallError::UnknownMethod(service.to_string()))
    }

    /// Names of registered services.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<_> = lock(&self.state).services.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Dispatchable method names for `service`, sorted.
    pub fn methods(&self, service: &str) -> Vec<String> {
        let state = lock(&self.state);
        let mut names: Vec<String> = state
            .services
            .get(service)
            .map(|t| t.iter().map(|(m, _)| m.to_string()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// The address passed to the last successful `bind`.
    pub fn address(&self) -> Option<BoundAddress> {
        lock(&self.state).address.clone()
    }

    /// The options passed to `bind`.
    pub fn options(&self) -> TransportOptions {
        lock(&self.state).options
    }

    /// Whether `shutdown` was called.
    pub fn is_shut_down(&self) -> bool {
        lock(&self.state).shut_down
    }
}

impl Transport for MemoryTransport {
    fn add_service(
        &mut self,
        service: &ServiceDescriptor,
        methods: MethodTable,
    ) -> Result<(), BoxError> {
        let mut state = lock(&self.state);
        if state.services.contains_key(service.name()) {
            return Err(format!("service already registered: {}", service.name()).into());
        }
        state.services.insert(service.name().to_string(), methods);
        Ok(())
    }

    fn remove_service(&mut self, service: &str) -> Result<(), BoxError> {
        lock(&self.state).services.remove(service);
        Ok(())
    }

    async fn bind(
        &mut self,
        host: &str,
        port: u16,
        options: TransportOptions,
    ) -> Result<BoundAddress, BoxError> {
        let mut state = lock(&self.state);
        if let Some(address) = &state.address {
            return Err(format!("already bound to {address}").into());
        }
        let address = BoundAddress {
            host: host.to_string(),
            port,
        };
        state.address = Some(address.clone());
        state.options = options;
        state.shut_down = false;
        Ok(address)
    }

    async fn shutdown(&mut self) -> Result<(), BoxError> {
        let mut state = lock(&self.state);
        state.shut_down = true;
        state.address = None;
        Ok(())
    }
}
