use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::email::EmailId;

pub type Result<T> = std::result::Result<T, MailError>;

#[derive(Debug, Error)]
pub enum MailError {
    /// Credentials missing or unreadable. Raised before any I/O.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected server response: {0}")]
    Protocol(String),

    #[error("message {0} not found")]
    MessageNotFound(EmailId),

    #[error("attachment '{filename}' not found in message {id}")]
    AttachmentNotFound { id: EmailId, filename: String },

    #[error("I/O error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("submission failed: {0}")]
    Submission(String),
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Connection,
    NotFound,
    Io,
    Send,
}

impl MailError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Connection(_)
            | Self::Transport(_)
            | Self::Tls(_)
            | Self::Auth(_)
            | Self::Protocol(_) => ErrorKind::Connection,
            Self::MessageNotFound(_) | Self::AttachmentNotFound { .. } => ErrorKind::NotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::InvalidAddress(_) | Self::Submission(_) => ErrorKind::Send,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
