//! Per-call contexts handed to hooks and handlers.
//!
//! Contexts are built fresh for every inbound call and never outlive it. The
//! payload and metadata sit behind `Arc`, so cloning a context for a closure
//! hook does not copy the request.

use crate::{error::SharedError, logger::Logger, metadata::Metadata};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{error::Error as StdError, sync::Arc};

/// The request, its metadata and the shared logger.
///
/// Seen by pre-request hooks and by the handler.
#[derive(Debug, Clone)]
pub struct CallContext {
    request: Arc<Value>,
    metadata: Arc<Metadata>,
    logger: Logger,
}

impl CallContext {
    /// Create a context for one inbound call.
    pub fn new(request: Value, metadata: Metadata, logger: Logger) -> Self {
        Self {
            request: Arc::new(request),
            metadata: Arc::new(metadata),
            logger,
        }
    }

    /// The request payload.
    pub fn request(&self) -> &Value {
        &self.request
    }

    /// Decode the request payload into a typed message.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.request.as_ref())
    }

    /// The call metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The shared logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// The request alongside the handler's response.
///
/// Seen by post-response hooks.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    request: Arc<Value>,
    response: Arc<Value>,
    metadata: Arc<Metadata>,
    logger: Logger,
}

impl ResponseContext {
    /// Attach a handler response to the call it answers.
    pub fn new(call: &CallContext, response: Value) -> Self {
        Self {
            request: Arc::clone(&call.request),
            response: Arc::new(response),
            metadata: Arc::clone(&call.metadata),
            logger: call.logger.clone(),
        }
    }

    /// The request payload.
    pub fn request(&self) -> &Value {
        &self.request
    }

    /// The handler's response payload.
    pub fn response(&self) -> &Value {
        &self.response
    }

    /// The call metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The shared logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Take the response back out, cloning only if a hook kept a copy.
    pub fn into_response(self) -> Value {
        Arc::unwrap_or_clone(self.response)
    }
}

/// The failing method and the handler's error.
///
/// Seen by post-error hooks.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    method: Arc<str>,
    error: SharedError,
    logger: Logger,
}

impl ErrorContext {
    /// Create a context for a failed handler.
    pub fn new(method: impl Into<Arc<str>>, error: SharedError, logger: Logger) -> Self {
        Self {
            method: method.into(),
            error,
            logger,
        }
    }

    /// Name of the method whose handler failed.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The handler's error.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.error
    }

    /// A shared handle to the handler's error.
    pub fn shared_error(&self) -> SharedError {
        Arc::clone(&self.error)
    }

    /// The shared logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Greeting {
        name: String,
    }

    #[test]
    fn test_decode_request() {
        let ctx = CallContext::new(json!({"name": "ada"}), Metadata::new(), Logger::disabled());
        let greeting: Greeting = ctx.decode().unwrap();
        assert_eq!(greeting, Greeting { name: "ada".into() });
        assert!(ctx.decode::<Vec<u8>>().is_err());
    }

    #[test]
    fn test_response_context_shares_request() {
        let mut md = Metadata::new();
        md.insert("trace", "1");
        let call = CallContext::new(json!({"q": 1}), md, Logger::disabled());
        let ctx = ResponseContext::new(&call, json!({"a": 2}));

        assert_eq!(ctx.request(), call.request());
        assert_eq!(ctx.metadata().get("trace"), Some("1"));
        assert_eq!(ctx.response(), &json!({"a": 2}));

        let kept = ctx.clone();
        assert_eq!(ctx.into_response(), json!({"a": 2}));
        assert_eq!(kept.response(), &json!({"a": 2}));
    }

    #[test]
    fn test_error_context() {
        let error: SharedError = Arc::new(std::io::Error::other("disk full"));
        let ctx = ErrorContext::new("Store", error.clone(), Logger::disabled());
        assert_eq!(ctx.method(), "Store");
        assert_eq!(ctx.error().to_string(), "disk full");
        assert!(Arc::ptr_eq(&ctx.shared_error(), &error));
    }
}
