use thiserror::Error;

/// Error taxonomy for the scan/mutate pipeline.
///
/// Every variant here is absorbed at the stage that observed it (spec §7):
/// none of these ever cross a channel boundary as data, only as a log
/// line or a stage's own early return.
#[derive(Error, Debug)]
pub enum TriremeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to connect to database: {0}")]
    Connect(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("timed out waiting for work assignment")]
    Timeout,

    #[error("aborted by user (SIGINT)")]
    UserAbort,

    #[error("confirmation declined")]
    ConfirmationDeclined,

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, TriremeError>;
