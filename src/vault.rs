use std::path::{Component, Path, PathBuf};

use crate::{Error, Result, VaultConfig};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotePath(PathBuf);

impl NotePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn as_str_lossy(&self) -> String {
        self.0.to_string_lossy().to_string()
    }

    pub fn file_name(&self) -> &str {
        self.0.file_name().and_then(|s| s.to_str()).unwrap_or("")
    }

    pub fn file_stem(&self) -> &str {
        self.0.file_stem().and_then(|s| s.to_str()).unwrap_or("")
    }

    /// First path component, or `"."` for documents at the vault root.
    pub fn top_level_folder(&self) -> String {
        if self.0.components().count() < 2 {
            return ".".to_string();
        }
        match self.0.components().next() {
            Some(Component::Normal(part)) => part.to_string_lossy().to_string(),
            _ => ".".to_string(),
        }
    }
}

impl TryFrom<&Path> for NotePath {
    type Error = Error;

    fn try_from(value: &Path) -> Result<Self> {
        if value.as_os_str().is_empty() {
            return Err(Error::InvalidVaultPath("empty path".into()));
        }
        if value.is_absolute() {
            return Err(Error::InvalidVaultPath(
                "absolute paths are not allowed".into(),
            ));
        }

        let mut cleaned = PathBuf::new();
        for c in value.components() {
            match c {
                Component::Prefix(_) | Component::RootDir => {
                    return Err(Error::InvalidVaultPath(
                        "absolute paths are not allowed".into(),
                    ));
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(Error::InvalidVaultPath(
                        "path traversal is not allowed".into(),
                    ));
                }
                Component::Normal(part) => cleaned.push(part),
            }
        }

        if cleaned.as_os_str().is_empty() {
            return Err(Error::InvalidVaultPath("empty path".into()));
        }

        Ok(Self(cleaned))
    }
}

impl TryFrom<&str> for NotePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        NotePath::try_from(Path::new(value))
    }
}

/// Collapse `.` and `..` segments without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// True iff `candidate` resolves (lexically) to the root itself or to a path
/// under it. Comparison is component-wise, so a sibling like `/vault-other`
/// never passes for root `/vault`.
///
/// Symlink targets are not resolved: a link nominally inside the root can
/// still point outside it. Containment of link targets is out of scope.
pub fn is_within_root(candidate: &Path, root: &Path) -> bool {
    let candidate = lexical_normalize(candidate);
    let root = lexical_normalize(root);
    candidate.starts_with(&root)
}

#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    cfg: VaultConfig,
}

impl Vault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(root, VaultConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, cfg: VaultConfig) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(Error::VaultNotFound(root));
        }
        let root = std::fs::canonicalize(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root, cfg })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &VaultConfig {
        &self.cfg
    }

    pub fn to_abs(&self, rel: &NotePath) -> PathBuf {
        self.root.join(rel.as_path())
    }

    /// Join and guard in one step. Every mutating operation resolves paths
    /// through this before any I/O; a failed check performs no I/O at all.
    pub fn guarded_abs(&self, rel: &NotePath) -> Result<PathBuf> {
        let abs = self.to_abs(rel);
        if !is_within_root(&abs, &self.root) {
            return Err(Error::PathEscape(abs));
        }
        Ok(abs)
    }

    pub fn to_rel(&self, abs: &Path) -> Result<NotePath> {
        let abs = if abs.is_absolute() {
            abs.to_path_buf()
        } else {
            self.root.join(abs)
        };

        let abs = lexical_normalize(&abs);
        if !abs.starts_with(&self.root) {
            return Err(Error::PathEscape(abs));
        }
        let rel = abs
            .strip_prefix(&self.root)
            .map_err(|_| Error::PathEscape(abs.clone()))?;
        NotePath::try_from(rel)
    }

    pub fn is_hidden_rel(&self, rel: &Path) -> bool {
        rel.components().any(|c| {
            let Component::Normal(part) = c else {
                return false;
            };
            part.to_string_lossy().starts_with(&self.cfg.hidden_prefix)
        })
    }

    pub fn is_document_rel(&self, rel: &Path) -> bool {
        if self.is_hidden_rel(rel) {
            return false;
        }
        let ext = rel.extension().and_then(|s| s.to_str()).unwrap_or("");
        self.cfg
            .note_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}
