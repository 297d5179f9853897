use std::time::Duration;
use thiserror::Error;

/// Transport-level failures of one resolver invocation.
///
/// A non-zero exit status of the tool is not an error at this level: its
/// captured output is still handed to the parsing layer.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("resolver call timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn resolver: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("other: {0}")]
    Other(String),
}
