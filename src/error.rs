use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vault root does not exist: {0}")]
    VaultNotFound(PathBuf),

    #[error("invalid vault path: {0}")]
    InvalidVaultPath(String),

    #[error("path escapes vault root: {0}")]
    PathEscape(PathBuf),

    #[error("document not found: {0}")]
    NotFound(PathBuf),

    #[error("document already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("checklist selector matches {} items: {}", candidates.len(), candidates.join("; "))]
    AmbiguousChecklistMatch { candidates: Vec<String> },

    #[error("no checklist item matches: {0}")]
    NoChecklistMatch(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("inference rules toml parse error: {0}")]
    RulesToml(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
