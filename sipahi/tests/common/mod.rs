#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use sipahi::{
    BoxError, CallContext, Handler, Logger, RequestHook, Server, ServerConfig, ServiceDescriptor,
    ServiceError, Value, testing::MemoryTransport,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Test Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EchoMessage {
    pub msg: String,
}

pub async fn echo(req: EchoMessage, _ctx: CallContext) -> Result<EchoMessage, BoxError> {
    Ok(EchoMessage { msg: req.msg })
}

// ============================================================================
// Test Hooks and Handlers
// ============================================================================

/// Rejects calls whose `authorization` metadata is not `token`.
pub struct TokenAuth {
    pub token: &'static str,
    pub checked: Arc<AtomicUsize>,
}

impl TokenAuth {
    pub fn new(token: &'static str) -> Self {
        Self {
            token,
            checked: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RequestHook for TokenAuth {
    async fn on_request(&self, ctx: &CallContext) -> Result<(), BoxError> {
        self.checked.fetch_add(1, Ordering::SeqCst);
        match ctx.metadata().get("authorization") {
            Some(token) if token == self.token => Ok(()),
            _ => Err(ServiceError::unauthenticated("missing or invalid token").into()),
        }
    }
}

pub struct PanickingHandler;

impl Handler for PanickingHandler {
    async fn call(&self, _ctx: CallContext) -> Result<Value, BoxError> {
        panic!("handler exploded")
    }
}

// ============================================================================
// Server Setup
// ============================================================================

pub const SERVICE: &str = "Test";

pub fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(SERVICE).with_methods(["Echo", "Fail", "Panic"])
}

/// A server over a fresh memory transport, plus a handle to drive calls.
pub fn server() -> (Server<MemoryTransport>, MemoryTransport) {
    let transport = MemoryTransport::new();
    let server = Server::with_logger(
        transport.clone(),
        ServerConfig::default(),
        Logger::disabled(),
    );
    (server, transport)
}
