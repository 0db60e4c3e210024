//! Logging Hook - Observability for the request lifecycle.

use sipahi_core::{
    BoxError, CallContext, ErrorContext, ErrorHook, RequestHook, ResponseContext, ResponseHook,
};

/// A hook that logs every phase through the context logger and never fails.
///
/// Register the same value in all three phases to trace a call end to end.
///
/// # Example
///
/// ```rust,ignore
/// use sipahi_std::{HookRegistryBuilder, hooks::LoggingHook};
///
/// let registry = HookRegistryBuilder::new()
///     .on_request(LoggingHook::named("greeter"))
///     .on_response(LoggingHook::named("greeter"))
///     .on_error(LoggingHook::named("greeter"))
///     .build();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoggingHook {
    name: &'static str,
}

impl LoggingHook {
    /// Create a new `LoggingHook` with a default name.
    pub const fn new() -> Self {
        Self { name: "call" }
    }

    /// Create a new `LoggingHook` with a custom name.
    ///
    /// The name prefixes every log message.
    pub const fn named(name: &'static str) -> Self {
        Self { name }
    }

    /// The log message prefix.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHook for LoggingHook {
    async fn on_request(&self, ctx: &CallContext) -> Result<(), BoxError> {
        ctx.logger().info(format_args!(
            "{}: request received ({} metadata keys)",
            self.name,
            ctx.metadata().len()
        ));
        ctx.logger()
            .debug(format_args!("{}: request {}", self.name, ctx.request()));
        Ok(())
    }
}

impl ResponseHook for LoggingHook {
    async fn on_response(&self, ctx: &ResponseContext) -> Result<(), BoxError> {
        ctx.logger()
            .info(format_args!("{}: response sent", self.name));
        ctx.logger()
            .debug(format_args!("{}: response {}", self.name, ctx.response()));
        Ok(())
    }
}

impl ErrorHook for LoggingHook {
    async fn on_error(&self, ctx: &ErrorContext) -> Result<(), BoxError> {
        ctx.logger().error(format_args!(
            "{}: {} failed: {}",
            self.name,
            ctx.method(),
            ctx.error()
        ));
        Ok(())
    }
}
