use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Directories whose name starts with this prefix are skipped entirely.
    pub hidden_prefix: String,
    /// File extensions (without dot) that are considered documents.
    pub note_extensions: Vec<String>,
    /// How long a cached scan stays fresh.
    pub scan_ttl: Duration,
    /// The single document holding the flat checklist (relative to root).
    pub checklist_path: PathBuf,
    /// Directory for daily notes (relative to root).
    pub daily_dir: PathBuf,
    /// Inference rules TOML path (relative to root).
    pub rules_path: PathBuf,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            hidden_prefix: ".".into(),
            note_extensions: vec!["md".into(), "markdown".into(), "txt".into()],
            scan_ttl: Duration::from_secs(30),
            checklist_path: PathBuf::from("Checklist.md"),
            daily_dir: PathBuf::from("Daily"),
            rules_path: PathBuf::from(".notevault/rules.toml"),
        }
    }
}
