use thiserror::Error;

use super::{AuthError, ProtocolError, TransportError};

/// Reason a single logical transaction failed.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Server answered {status}.")]
    Status { status: u16 },
}

impl TransactionError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, TransactionError::Transport(TransportError::Cancelled))
    }
}
