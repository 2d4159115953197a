use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by every [`RemoteFileSystem`](crate::client::RemoteFileSystem) operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The address argument was missing (empty or blank).
    #[error("address argument is missing")]
    NullArgument,
    /// The address is not an absolute URL for the client's protocol.
    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },
    /// Network failure or non-success protocol status.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    /// A listing response could not be turned into file entries.
    #[error("malformed listing response: {0}")]
    MalformedResponse(String),
}

impl Error {
    pub(crate) fn invalid_address(address: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse(reason.into())
    }
}

/// The underlying transport failure, left intact so callers can inspect
/// status codes and reply lines themselves.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("FTP: {0}")]
    Ftp(#[from] suppaftp::FtpError),
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("connection group `{0}` is closed")]
    PoolClosed(String),
}

impl From<suppaftp::FtpError> for Error {
    fn from(err: suppaftp::FtpError) -> Self {
        Self::Transport(err.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Transport(err.into())
    }
}
