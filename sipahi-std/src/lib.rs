//! # sipahi-std
//!
//! Standard implementations for the Sipahi request hook pipeline.
//!
//! This crate provides:
//! - **Hook registry**: [`HookRegistryBuilder`], [`HookRegistry`]
//! - **Method bindings**: [`MethodBindings`]
//! - **Dispatch**: [`Pipeline`], [`MethodDispatcher`], [`InboundCall`]
//! - **Service glue**: [`ServiceDescriptor`], [`MethodTable`], [`Transport`]
//! - **Standard hooks**: Logging
//! - **Testing utilities**: recording hooks, counting handlers, an in-memory transport

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use sipahi_core;

// Modules
pub mod binding;
pub mod dispatch;
pub mod hooks;
pub mod registry;
pub mod service;
pub mod testing;

pub use binding::MethodBindings;
pub use dispatch::{CompletionSink, InboundCall, MethodDispatcher, Outcome, Pipeline};
pub use registry::{HookRegistry, HookRegistryBuilder, HookSequence, PhaseHook};
pub use service::{BoundAddress, MethodTable, ServiceDescriptor, Transport, TransportOptions};
