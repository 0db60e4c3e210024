//! Mapping call failures to RPC status codes.
//!
//! Handlers and hooks that want a specific status return a [`ServiceError`]
//! (boxed like any other error). Everything else maps to a generic code:
//!
//! | Failure                        | Code              |
//! |--------------------------------|-------------------|
//! | [`ServiceError`] in the chain  | its own code      |
//! | panic in a hook or handler     | `Internal`        |
//! | no handler for the method      | `Unimplemented`   |
//! | transport not serving          | `Unavailable`     |
//! | anything else                  | `Unknown`         |

use sipahi_core::{CallError, HookError};
use thiserror::Error;
use tonic::{Code, Status};

/// An error carrying an explicit status code.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_user(req: GetUser, _ctx: CallContext) -> Result<User, BoxError> {
///     let user = lookup(req.id).ok_or_else(|| ServiceError::not_found("no such user"))?;
///     Ok(user)
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    code: Code,
    message: String,
}

impl ServiceError {
    /// Create an error with `code` and `message`.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `InvalidArgument`.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// `NotFound`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// `AlreadyExists`.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(Code::AlreadyExists, message)
    }

    /// `PermissionDenied`.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Code::PermissionDenied, message)
    }

    /// `Unauthenticated`.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(Code::Unauthenticated, message)
    }

    /// `FailedPrecondition`.
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(Code::FailedPrecondition, message)
    }

    /// `Unavailable`.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// `Internal`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// The status code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// The status message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        Status::new(err.code, err.message)
    }
}

/// Conversion of a failure into the [`Status`] reported to the caller.
pub trait ToStatus {
    /// Build the status for this failure.
    fn to_status(&self) -> Status;
}

impl ToStatus for ServiceError {
    fn to_status(&self) -> Status {
        Status::new(self.code, self.message.clone())
    }
}

impl ToStatus for CallError {
    fn to_status(&self) -> Status {
        if let Some(service) = self.find_source::<ServiceError>() {
            return service.to_status();
        }
        if let Some(HookError::Panic(_)) = self.find_source::<HookError>() {
            return Status::internal(self.to_string());
        }
        match self {
            CallError::UnknownMethod(_) => Status::unimplemented(self.to_string()),
            CallError::Unavailable(_) => Status::unavailable(self.to_string()),
            _ => Status::unknown(self.to_string()),
        }
    }
}
