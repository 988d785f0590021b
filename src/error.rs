//! Crate-wide error taxonomy (§7). Each variant corresponds to one row
//! in the spec's error taxonomy table, so callers match on type instead
//! of inspecting message strings.

use thiserror::Error;

/// Errors the Correlation Bus itself can raise (§4.A "Failure modes").
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no reply observed within the request's TTL")]
    TimedOut,
    #[error("bus backing store unreachable: {0}")]
    StoreUnreachable(String),
}

/// Errors a command handler can produce before a `Response` is written
/// (§7). The dispatcher (§4.C) catches all of these and normalizes them
/// into a `failed` response; it never lets one escape the loop.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Caller-supplied command was malformed. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),
    /// An exit command found nothing to exit (§3 "Order Command"
    /// invariant, §7 "No-action"). Not an error — the dispatcher
    /// surfaces this as `status=no_action`, never `failed`.
    #[error("no matching position: {0}")]
    NoAction(String),
    /// Worker is `Reconnecting` or `Degraded`. Retryable.
    #[error("session not ready")]
    SessionNotReady,
    /// Upstream returned a business rejection. Surfaced verbatim.
    #[error("upstream refused: {0}")]
    UpstreamRefused(String),
    /// Timeout, disconnect, token skew. Retryable; drives the worker
    /// state machine.
    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),
}

impl HandlerError {
    /// Whether the caller should consider retrying the same command.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerError::SessionNotReady | HandlerError::UpstreamTransient(_)
        )
    }

    /// Which §7 taxonomy row this failure belongs to, so the dispatcher
    /// can carry it into the `Response` the facade reads back (§4.G
    /// status-code mapping). `NoAction` has no taxonomy row of its own —
    /// it is surfaced as `status=no_action`, never as a failure.
    pub fn error_kind(&self) -> crate::domain::command::ErrorKind {
        use crate::domain::command::ErrorKind;
        match self {
            HandlerError::Validation(_) => ErrorKind::Validation,
            HandlerError::NoAction(_) => {
                unreachable!("NoAction is handled as ResponseStatus::NoAction, not Failed")
            }
            HandlerError::SessionNotReady => ErrorKind::SessionNotReady,
            HandlerError::UpstreamRefused(_) => ErrorKind::UpstreamRefused,
            HandlerError::UpstreamTransient(_) => ErrorKind::UpstreamTransient,
        }
    }
}

impl From<crate::upstream::UpstreamError> for HandlerError {
    fn from(err: crate::upstream::UpstreamError) -> Self {
        use crate::upstream::{UpstreamErrorClass, classify};
        match classify(&err) {
            UpstreamErrorClass::TokenExpired
            | UpstreamErrorClass::SocketDropped
            | UpstreamErrorClass::TimestampSkew => HandlerError::UpstreamTransient(err.message),
            UpstreamErrorClass::BusinessRejected | UpstreamErrorClass::Unknown => {
                HandlerError::UpstreamRefused(err.message)
            }
        }
    }
}
