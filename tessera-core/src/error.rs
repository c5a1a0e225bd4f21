//! Error types for tessera-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Identity, ProjectId, RecordKind};

/// Precondition failures of registry operations.
///
/// Every variant is caller-correctable and leaves the registry unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The referenced project or block does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: u64 },

    /// The caller is not the creator (or registry owner) the operation requires.
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Identity,
        action: &'static str,
    },

    /// Blocks cannot be attached to a deactivated project.
    #[error("project {project_id} is inactive")]
    InactiveParent { project_id: ProjectId },

    /// The empty identity was supplied where a real one is required.
    #[error("invalid argument: {field} must not be the empty identity")]
    InvalidArgument { field: &'static str },
}

/// All errors that can arise from snapshot and journal persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (journal path).
    #[error("journal JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.tessera/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No snapshot exists yet at the expected path.
    #[error("registry not found at {path}")]
    RegistryNotFound { path: PathBuf },

    /// `init` was called against an existing snapshot.
    #[error("registry already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    /// The journal hash chain or sequence is broken.
    #[error("journal corrupted at entry {seq}: {reason}")]
    JournalCorrupted { seq: u64, reason: String },

    /// The mutation itself was rejected; nothing was written.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
