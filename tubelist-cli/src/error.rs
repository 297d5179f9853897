use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures that abort the run. Per-item resolution problems never reach
/// this type; they degrade inside the worker.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
}
