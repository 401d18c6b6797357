use std::time::Duration;

use thiserror::Error;
use toolbridge_protocol::RpcError;

use super::SessionState;
use crate::transport::TransportError;

/// Errors of a [`Session`](super::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport failed. The session is closed afterwards.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The provider rejected the handshake, exited, or didn't answer in
    /// time. The session is closed afterwards.
    #[error("handshake with the tool provider failed: {reason}")]
    Handshake {
        /// What went wrong.
        reason: String,
    },
    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state of the session.
        state: SessionState,
    },
    /// The provider doesn't know the tool.
    #[error("tool `{name}` not found: {message}")]
    ToolNotFound {
        /// The requested tool.
        name: String,
        /// The provider's explanation.
        message: String,
    },
    /// A tool call didn't finish in time.
    #[error("tool `{name}` did not respond within {timeout:?}")]
    ToolCallTimeout {
        /// The called tool.
        name: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// Any other request didn't finish in time.
    #[error("`{method}` did not respond within {timeout:?}")]
    RequestTimeout {
        /// The request method.
        method: &'static str,
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// The provider answered with an error.
    #[error("tool provider failed on `{method}`: {error}")]
    Provider {
        /// The request method.
        method: &'static str,
        /// The error from the provider.
        error: RpcError,
    },
    /// The provider answered with a result that doesn't follow the
    /// protocol.
    #[error("unexpected `{method}` result from tool provider: {reason}")]
    Protocol {
        /// The request method.
        method: &'static str,
        /// What is wrong with the result.
        reason: String,
    },
}

impl SessionError {
    /// Returns whether the session can't be used anymore after this error.
    ///
    /// Non-fatal errors only concern the request that failed, they are
    /// reported back to the model as failed tool results.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(_)
                | SessionError::Handshake { .. }
                | SessionError::InvalidState { .. }
        )
    }
}
