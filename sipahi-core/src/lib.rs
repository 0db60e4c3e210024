//! # sipahi-core
//!
//! Core traits for the Sipahi request hook pipeline.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! hook and handler authors that don't need the dispatcher in `sipahi-std`.
//!
//! # Request Lifecycle
//!
//! Every inbound call for a bound method passes through three ordered phases
//! around the user handler:
//!
//! ## Pre-request ([`RequestHook`])
//!
//! Runs before the handler with the [`CallContext`]. The first failure rejects
//! the call; the handler never runs.
//!
//! ## Handler ([`Handler`])
//!
//! The terminal business logic. Receives the [`CallContext`] and produces a
//! response payload or a failure.
//!
//! ## Post-response ([`ResponseHook`])
//!
//! Runs after a successful handler with the [`ResponseContext`]. A failure here
//! replaces the response with that failure.
//!
//! ## Post-error ([`ErrorHook`])
//!
//! Runs after a failed handler with the [`ErrorContext`]. These hooks are side
//! channels: they can never replace the original failure.
//!
//! # Error Types
//!
//! - [`CallError`] - Outcome of a single call, tagged by the failing stage
//! - [`HookError`] - Failures raised while running a pipeline step
//! - [`RegistryError`] - Setup-time registration errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod error;
mod handler;
mod hook;
mod logger;
mod metadata;
mod phase;

// Re-exports
pub use context::{CallContext, ErrorContext, ResponseContext};
pub use error::{BoxError, CallError, HookError, RegistryError, SharedError};
pub use handler::{DynHandler, Handler, TypedHandler};
pub use hook::{DynErrorHook, DynRequestHook, DynResponseHook, ErrorHook, RequestHook, ResponseHook};
pub use logger::Logger;
pub use metadata::Metadata;
pub use phase::Phase;

/// Payload type carried by requests and responses.
pub use serde_json::Value;
