//! # sipahi - RPC Server with Request Lifecycle Hooks
//!
//! `sipahi` wraps an RPC transport with an ordered hook pipeline. Every call
//! to a bound method runs pre-request hooks, the handler, then either
//! post-response or post-error hooks, in registration order.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sipahi::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct HelloRequest { name: String }
//!
//! #[derive(Serialize)]
//! struct HelloReply { message: String }
//!
//! async fn say_hello(req: HelloRequest, _ctx: CallContext) -> Result<HelloReply, BoxError> {
//!     Ok(HelloReply { message: format!("Hello {}", req.name) })
//! }
//!
//! let mut server = Server::new(transport, ServerConfig::default())?;
//! server
//!     .add_service(ServiceDescriptor::new("Greeter").with_method("SayHello"))?
//!     .bind_typed("SayHello", say_hello)?
//!     .on_request(LoggingHook::named("greeter"))?;
//! server.listen(ListenOptions::new(50051)).await?;
//! ```
//!
//! ## Failure Semantics
//!
//! - A failing pre-request hook rejects the call; the handler never runs.
//! - A failing post-response hook replaces the response with its failure.
//! - Post-error hooks observe the handler failure but never replace it.
//! - Panics anywhere in the pipeline become ordinary failures.
//!
//! Use [`ToStatus`] to turn a [`CallError`] into the status sent to the caller.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod config;
mod error;
mod server;
mod status;

#[cfg(feature = "tower")]
pub mod tower;

pub use sipahi_core::{
    // Errors
    BoxError,
    // Contexts
    CallContext,
    CallError,
    // Hooks
    DynErrorHook,
    // Handlers
    DynHandler,
    DynRequestHook,
    DynResponseHook,
    ErrorContext,
    ErrorHook,
    Handler,
    HookError,
    // Logging
    Logger,
    // Metadata
    Metadata,
    Phase,
    RegistryError,
    RequestHook,
    ResponseContext,
    ResponseHook,
    SharedError,
    TypedHandler,
    // Payload
    Value,
};

pub use sipahi_std::{
    BoundAddress, CompletionSink, HookRegistry, HookRegistryBuilder, HookSequence, InboundCall,
    MethodBindings, MethodDispatcher, MethodTable, Outcome, PhaseHook, Pipeline,
    ServiceDescriptor, Transport, TransportOptions,
};

pub use config::{DEFAULT_HOST, ListenOptions, LoggerConfig, ServerConfig};
pub use error::{ConfigError, ServerError};
pub use server::Server;
pub use status::{ServiceError, ToStatus};
pub use tonic::{Code, Status};

/// Standard hook implementations.
pub mod hooks {
    #![allow(clippy::wildcard_imports)]
    pub use sipahi_std::hooks::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use sipahi_std::testing::*;
}

/// Prelude module - common imports for Sipahi.
///
/// # Usage
///
/// ```rust,ignore
/// use sipahi::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        BoxError,
        CallError,
        // Contexts
        CallContext,
        ErrorContext,
        // Core traits
        ErrorHook,
        Handler,
        // Server
        ListenOptions,
        Metadata,
        RequestHook,
        ResponseContext,
        ResponseHook,
        Server,
        ServerConfig,
        ServerError,
        ServiceDescriptor,
        ServiceError,
        ToStatus,
        Value,
        hooks::LoggingHook,
    };
    pub use serde::{Deserialize, Serialize};
}
