//! Service binding glue.
//!
//! Translates method bindings plus caller-supplied service descriptors into
//! the registration call a transport expects. The transport itself
//! (connections, framing, routing to a service) lives behind [`Transport`].

use crate::{
    binding::MethodBindings,
    dispatch::{InboundCall, MethodDispatcher, Outcome, Pipeline},
};
use serde::{Deserialize, Serialize};
use sipahi_core::{BoxError, CallError, Metadata, Value};
use std::{collections::HashMap, fmt, future::Future};

/// A transport-level service: its fully-qualified name and method names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    name: String,
    methods: Vec<String>,
}

impl ServiceDescriptor {
    /// Describe a service with no methods yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a method name.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    /// Add several method names.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// The fully-qualified service name, e.g. `helloworld.Greeter`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method names declared by the service.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }
}

/// The dispatch functions attached to one service.
#[derive(Clone)]
pub struct MethodTable {
    service: String,
    methods: HashMap<String, MethodDispatcher>,
}

impl MethodTable {
    /// Attach a dispatcher for every descriptor method that has a binding.
    ///
    /// Declared methods without a handler are left out; the transport answers
    /// them as unimplemented.
    pub fn build(
        descriptor: &ServiceDescriptor,
        bindings: &MethodBindings,
        pipeline: &Pipeline,
    ) -> Self {
        let methods = descriptor
            .methods()
            .iter()
            .filter_map(|method| {
                let handler = bindings.get(method)?;
                Some((method.clone(), pipeline.bind_dyn(method.as_str(), handler.clone())))
            })
            .collect();
        Self {
            service: descriptor.name().to_string(),
            methods,
        }
    }

    /// The service this table belongs to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The dispatcher for `method`.
    pub fn get(&self, method: &str) -> Option<&MethodDispatcher> {
        self.methods.get(method)
    }

    /// Iterate over `(method, dispatcher)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MethodDispatcher)> {
        self.methods.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of dispatchable methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if no method is dispatchable.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Run one call to `method`, or fail with [`CallError::UnknownMethod`].
    pub async fn call(&self, method: &str, request: Value, metadata: Metadata) -> Outcome {
        match self.get(method) {
            Some(dispatcher) => dispatcher.run(request, metadata).await,
            None => Err(self.unknown(method)),
        }
    }

    /// Route an inbound call to `method` and complete it.
    pub async fn dispatch(&self, method: &str, call: InboundCall) {
        match self.get(method) {
            Some(dispatcher) => dispatcher.dispatch(call).await,
            None => call.complete.complete(Err(self.unknown(method))),
        }
    }

    fn unknown(&self, method: &str) -> CallError {
        CallError::UnknownMethod(format!("{}/{}", self.service, method))
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("service", &self.service)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Message size limits forwarded to the transport. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Largest inbound message accepted, in bytes.
    pub max_receive_message_length: Option<usize>,
    /// Largest outbound message sent, in bytes.
    pub max_send_message_length: Option<usize>,
}

/// The address a transport ended up listening on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundAddress {
    /// Host name or IP.
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl fmt::Display for BoundAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The RPC transport a server registers its services with.
pub trait Transport: Send {
    /// Register a service and the dispatch functions for its methods.
    fn add_service(
        &mut self,
        service: &ServiceDescriptor,
        methods: MethodTable,
    ) -> Result<(), BoxError>;

    /// Withdraw a service registered with [`add_service`](Transport::add_service).
    ///
    /// Used to undo a partial setup when starting fails. Removing an unknown
    /// service is not an error.
    fn remove_service(&mut self, service: &str) -> Result<(), BoxError>;

    /// Start listening.
    fn bind(
        &mut self,
        host: &str,
        port: u16,
        options: TransportOptions,
    ) -> impl Future<Output = Result<BoundAddress, BoxError>> + Send;

    /// Stop accepting calls and drop in-flight ones.
    fn shutdown(&mut self) -> impl Future<Output = Result<(), BoxError>> + Send;
}
