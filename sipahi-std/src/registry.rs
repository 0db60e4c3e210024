//! Registry module for hook management.
//!
//! Hooks are collected with a [`HookRegistryBuilder`] during setup, then
//! frozen into an immutable [`HookRegistry`] shared by every dispatcher.
//! Within a phase, registration order is invocation order: no priorities,
//! no deduplication.

use sipahi_core::{
    DynErrorHook, DynRequestHook, DynResponseHook, ErrorHook, Phase, RegistryError, RequestHook,
    ResponseHook,
};
use std::{fmt, sync::Arc};

/// A hook tagged with the phase it implements.
#[derive(Clone)]
pub enum PhaseHook {
    /// A pre-request hook.
    Request(Arc<dyn DynRequestHook>),
    /// A post-response hook.
    Response(Arc<dyn DynResponseHook>),
    /// A post-error hook.
    Error(Arc<dyn DynErrorHook>),
}

impl PhaseHook {
    /// Wrap a pre-request hook.
    pub fn request<H: RequestHook>(hook: H) -> Self {
        Self::Request(Arc::new(hook))
    }

    /// Wrap a post-response hook.
    pub fn response<H: ResponseHook>(hook: H) -> Self {
        Self::Response(Arc::new(hook))
    }

    /// Wrap a post-error hook.
    pub fn error<H: ErrorHook>(hook: H) -> Self {
        Self::Error(Arc::new(hook))
    }

    /// The phase this hook runs in.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Request(_) => Phase::Request,
            Self::Response(_) => Phase::Response,
            Self::Error(_) => Phase::Error,
        }
    }
}

impl fmt::Debug for PhaseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PhaseHook").field(&self.phase()).finish()
    }
}

// ============================================================================
// HookRegistryBuilder - append-only setup
// ============================================================================

/// Builder for constructing a [`HookRegistry`].
///
/// # Example
/// ```ignore
/// let registry = HookRegistryBuilder::new()
///     .on_request(auth_hook)
///     .on_response(audit_hook)
///     .on_error(alert_hook)
///     .build();
/// ```
#[derive(Clone, Default)]
pub struct HookRegistryBuilder {
    on_request: Vec<Arc<dyn DynRequestHook>>,
    on_response: Vec<Arc<dyn DynResponseHook>>,
    on_error: Vec<Arc<dyn DynErrorHook>>,
}

impl HookRegistryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `hook` to the sequence for `phase`.
    ///
    /// Fails with [`RegistryError::PhaseMismatch`] if the hook implements a
    /// different phase.
    pub fn register(&mut self, phase: Phase, hook: PhaseHook) -> Result<(), RegistryError> {
        if hook.phase() != phase {
            return Err(RegistryError::PhaseMismatch {
                expected: phase,
                found: hook.phase(),
            });
        }
        match hook {
            PhaseHook::Request(h) => self.on_request.push(h),
            PhaseHook::Response(h) => self.on_response.push(h),
            PhaseHook::Error(h) => self.on_error.push(h),
        }
        Ok(())
    }

    /// Register a pre-request hook.
    pub fn on_request<H: RequestHook>(mut self, hook: H) -> Self {
        self.on_request_mut(hook);
        self
    }

    /// Register a pre-request hook (mutable version).
    pub fn on_request_mut<H: RequestHook>(&mut self, hook: H) {
        self.on_request.push(Arc::new(hook));
    }

    /// Register a post-response hook.
    pub fn on_response<H: ResponseHook>(mut self, hook: H) -> Self {
        self.on_response_mut(hook);
        self
    }

    /// Register a post-response hook (mutable version).
    pub fn on_response_mut<H: ResponseHook>(&mut self, hook: H) {
        self.on_response.push(Arc::new(hook));
    }

    /// Register a post-error hook.
    pub fn on_error<H: ErrorHook>(mut self, hook: H) -> Self {
        self.on_error_mut(hook);
        self
    }

    /// Register a post-error hook (mutable version).
    pub fn on_error_mut<H: ErrorHook>(&mut self, hook: H) {
        self.on_error.push(Arc::new(hook));
    }

    /// Freeze the builder into an immutable registry.
    pub fn build(self) -> HookRegistry {
        HookRegistry {
            on_request: self.on_request,
            on_response: self.on_response,
            on_error: self.on_error,
        }
    }

    /// Total number of registered hooks across all phases.
    pub fn len(&self) -> usize {
        self.on_request.len() + self.on_response.len() + self.on_error.len()
    }

    /// Check if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// HookRegistry - immutable, thread-safe hook storage
// ============================================================================

/// An immutable, thread-safe registry of hooks.
///
/// Created by [`HookRegistryBuilder::build`]. Share it via `Arc`.
#[derive(Default)]
pub struct HookRegistry {
    on_request: Vec<Arc<dyn DynRequestHook>>,
    on_response: Vec<Arc<dyn DynResponseHook>>,
    on_error: Vec<Arc<dyn DynErrorHook>>,
}

/// A read-only view of the hooks registered for one phase.
#[derive(Clone, Copy)]
pub enum HookSequence<'a> {
    /// Pre-request hooks.
    Request(&'a [Arc<dyn DynRequestHook>]),
    /// Post-response hooks.
    Response(&'a [Arc<dyn DynResponseHook>]),
    /// Post-error hooks.
    Error(&'a [Arc<dyn DynErrorHook>]),
}

impl HookSequence<'_> {
    /// Number of hooks in the sequence.
    pub fn len(&self) -> usize {
        match self {
            Self::Request(s) => s.len(),
            Self::Response(s) => s.len(),
            Self::Error(s) => s.len(),
        }
    }

    /// Check if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HookRegistry {
    /// The ordered hooks for `phase`.
    pub fn sequence_for(&self, phase: Phase) -> HookSequence<'_> {
        match phase {
            Phase::Request => HookSequence::Request(&self.on_request),
            Phase::Response => HookSequence::Response(&self.on_response),
            Phase::Error => HookSequence::Error(&self.on_error),
        }
    }

    /// Pre-request hooks in registration order.
    pub fn request_hooks(&self) -> &[Arc<dyn DynRequestHook>] {
        &self.on_request
    }

    /// Post-response hooks in registration order.
    pub fn response_hooks(&self) -> &[Arc<dyn DynResponseHook>] {
        &self.on_response
    }

    /// Post-error hooks in registration order.
    pub fn error_hooks(&self) -> &[Arc<dyn DynErrorHook>] {
        &self.on_error
    }

    /// Total number of hooks across all phases.
    pub fn len(&self) -> usize {
        self.on_request.len() + self.on_response.len() + self.on_error.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("on_request", &self.on_request.len())
            .field("on_response", &self.on_response.len())
            .field("on_error", &self.on_error.len())
            .finish()
    }
}
