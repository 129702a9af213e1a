use std::io;
use std::path::PathBuf;

/// Failures of the host environment, never of the submitted code.
///
/// These are logged in full but only surface to callers as a sanitized
/// internal-error verdict, except for workspace allocation and an invalid
/// timeout, which are returned as errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to create scratch root {path}: {source}")]
    ScratchRoot { path: PathBuf, source: io::Error },

    #[error("failed to create workspace {path}: {source}")]
    WorkspaceCreate { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    WriteFile { path: PathBuf, source: io::Error },

    /// The compiler or runtime itself could not be launched
    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("timeout must be greater than zero")]
    InvalidTimeout,
}
