// ============================================================================
// error.rs — Error kinds shared across the whole project manager
// ============================================================================
//
// Every fallible operation in this crate returns `Result<T, Error>`. `Custom`
// is reserved for diagnostics that have already been printed at their own
// call site (e.g. a TOML parse error with a caret); callers must not print
// it again, only propagate it and map it to a non-zero exit code.
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Already reported at the call site; callers must not print this again.
    #[error("")]
    Custom,

    #[error("bad path: {0}")]
    BadPath(PathBuf),

    #[error("not a known tool or program: {0}")]
    BadProgram(String),

    #[error("{path}:{line}:{col}: error: {message}")]
    BadManifest {
        path: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },

    #[error("not a project: {0}")]
    NotAProject(PathBuf),

    #[error("no compilable sources in {0}")]
    NoFiles(PathBuf),

    #[error("{0} is not part of this project")]
    NotSameRoot(PathBuf),

    #[error("no build rule for {0}")]
    NoRule(PathBuf),

    #[error("git clone/checkout failed for {0}")]
    CloneFailed(String),

    #[error("failed to write {0}")]
    WriteFailed(PathBuf),

    #[error("dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("version conflict for '{name}': requested {requested}, already resolved to {resolved}")]
    VersionConflict {
        name: String,
        requested: String,
        resolved: String,
    },

    #[error("compiler exited with status {status}: {command}")]
    CompilerFailed { command: String, status: i32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `Custom` has already printed its own diagnostic; every other kind
    /// still needs `main` to print `self` before exiting.
    pub fn already_reported(&self) -> bool {
        matches!(self, Error::Custom)
    }
}
