//! Error types for Sipahi.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`CallError`] - The failure delivered to the caller of one inbound call
//! - [`HookError`] - Errors raised while running a hook or handler
//! - [`RegistryError`] - Errors from handler and hook registration

use crate::phase::Phase;
use std::{error::Error as StdError, sync::Arc};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A reference-counted error, shared between hook contexts and the call outcome.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// The failure delivered to the completion sink of one inbound call.
///
/// The variant records the stage that failed. `Display` is transparent, so the
/// caller sees the original error message unchanged.
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// A pre-request hook failed; the handler never ran.
    #[error(transparent)]
    PreRequest(SharedError),

    /// The handler failed. Error hooks observed it but could not replace it.
    #[error(transparent)]
    Handler(SharedError),

    /// The handler succeeded but a post-response hook failed.
    /// The computed response was discarded.
    #[error(transparent)]
    PostResponse(SharedError),

    /// The transport routed a call to a method without a bound handler.
    #[error("method not implemented: {0}")]
    UnknownMethod(String),

    /// The transport is not serving, so the call never reached a dispatcher.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl CallError {
    /// The error raised by the failing hook or handler, if any.
    pub fn inner(&self) -> Option<&SharedError> {
        match self {
            Self::PreRequest(e) | Self::Handler(e) | Self::PostResponse(e) => Some(e),
            Self::UnknownMethod(_) | Self::Unavailable(_) => None,
        }
    }

    /// Walk the inner error and its `source()` chain looking for an `E`.
    pub fn find_source<E: StdError + 'static>(&self) -> Option<&E> {
        let mut current = self
            .inner()
            .map(|e| &**e as &(dyn StdError + 'static));
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

/// Failures the pipeline itself raises on behalf of a hook or handler.
///
/// Errors returned by user code are passed through untouched.
#[derive(Error, Debug)]
pub enum HookError {
    /// The hook or handler panicked, either while building its future or
    /// while it was being polled.
    #[error("panicked: {0}")]
    Panic(String),
}

/// Errors raised while registering handlers and hooks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler is already bound for this method name.
    #[error("handler already bound for method: {0}")]
    DuplicateBinding(String),

    /// The phase name is not one of `onRequest`, `onResponse`, `onError`.
    #[error("invalid hook phase: {0}")]
    InvalidPhase(String),

    /// A hook was registered under a phase it does not implement.
    #[error("{found} hook cannot be registered as {expected}")]
    PhaseMismatch {
        /// The phase named at registration.
        expected: Phase,
        /// The phase the hook implements.
        found: Phase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("quota exceeded")]
    struct QuotaError;

    #[derive(Debug, Error)]
    #[error("request rejected")]
    struct Wrapper(#[source] QuotaError);

    #[test]
    fn test_call_error_display_is_transparent() {
        let err = CallError::Handler(Arc::new(QuotaError));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn test_find_source_walks_chain() {
        let err = CallError::PreRequest(Arc::new(Wrapper(QuotaError)));
        assert!(err.find_source::<Wrapper>().is_some());
        assert!(err.find_source::<QuotaError>().is_some());
        assert!(err.find_source::<HookError>().is_none());
    }

    #[test]
    fn test_unknown_method_has_no_inner() {
        let err = CallError::UnknownMethod("Greeter/Missing".into());
        assert!(err.inner().is_none());
        assert_eq!(err.to_string(), "method not implemented: Greeter/Missing");
    }

    #[test]
    fn test_unavailable_is_distinct_from_unknown_method() {
        let err = CallError::Unavailable("Greeter: transport not serving".into());
        assert!(err.inner().is_none());
        assert!(!matches!(err, CallError::UnknownMethod(_)));
        assert_eq!(
            err.to_string(),
            "service unavailable: Greeter: transport not serving"
        );
    }

    #[test]
    fn test_registry_error_messages() {
        let err = RegistryError::PhaseMismatch {
            expected: Phase::Request,
            found: Phase::Error,
        };
        assert_eq!(err.to_string(), "onError hook cannot be registered as onRequest");
        assert_eq!(
            RegistryError::DuplicateBinding("Echo".into()).to_string(),
            "handler already bound for method: Echo"
        );
    }
}
