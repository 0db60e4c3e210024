//! Lifecycle phases at which hooks run.

use crate::error::RegistryError;
use std::{fmt, str::FromStr};

/// One of the three points in the request lifecycle where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the handler.
    Request,
    /// After a successful handler.
    Response,
    /// After a failed handler.
    Error,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Phase; 3] = [Phase::Request, Phase::Response, Phase::Error];

    /// The registration name of this phase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Request => "onRequest",
            Phase::Response => "onResponse",
            Phase::Error => "onError",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onRequest" | "on_request" => Ok(Phase::Request),
            "onResponse" | "on_response" => Ok(Phase::Response),
            "onError" | "on_error" => Ok(Phase::Error),
            other => Err(RegistryError::InvalidPhase(other.to_string())),
        }
    }
}
