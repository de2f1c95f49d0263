use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::fields::FieldValue;
use crate::parse::{decode_document, DocumentParse};
use crate::{Result, Vault};

/// A file the walk could not read. The walk still completes; these are the
/// partial-failure record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaultStats {
    pub total_documents: usize,
    /// Document count per top-level folder; root-level files under `"."`.
    pub folder_counts: BTreeMap<String, usize>,
    /// Occurrences of each tag across all metadata blocks.
    pub tag_counts: BTreeMap<String, usize>,
    /// Every metadata field name observed anywhere in the tree.
    pub field_names: BTreeSet<String>,
    pub errors: Vec<ScanFailure>,
}

/// Walk the whole tree once. Hidden-prefix directories are pruned with their
/// contents; a document whose metadata fails to decode still counts toward
/// document and folder totals.
pub fn scan_vault(vault: &Vault) -> VaultStats {
    let mut stats = VaultStats::default();
    let hidden_prefix = vault.config().hidden_prefix.clone();

    let walker = walkdir::WalkDir::new(vault.root())
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            !e.file_name()
                .to_string_lossy()
                .starts_with(&hidden_prefix)
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(PathBuf::from).unwrap_or_default();
                stats.errors.push(ScanFailure {
                    path,
                    message: err.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let abs = entry.path();
        let rel = match vault.to_rel(abs) {
            Ok(r) => r,
            Err(_) => continue,
        };
        if !vault.is_document_rel(rel.as_path()) {
            continue;
        }

        stats.total_documents += 1;
        *stats.folder_counts.entry(rel.top_level_folder()).or_default() += 1;

        let content = match std::fs::read_to_string(abs) {
            Ok(c) => c,
            Err(err) => {
                warn!(path = %abs.display(), error = %err, "unreadable document skipped");
                stats.errors.push(ScanFailure {
                    path: abs.to_path_buf(),
                    message: err.to_string(),
                });
                continue;
            }
        };

        match decode_document(&content) {
            DocumentParse::Valid { block, .. } => {
                for (key, value) in &block {
                    stats.field_names.insert(key.clone());
                    if key == "tags" {
                        if let FieldValue::List(items) = value {
                            for tag in items.iter().filter_map(|v| v.as_str()) {
                                *stats.tag_counts.entry(tag.to_string()).or_default() += 1;
                            }
                        }
                    }
                }
            }
            // Absent and malformed read the same here: counts only.
            DocumentParse::Absent | DocumentParse::Malformed { .. } => {}
        }
    }

    debug!(
        documents = stats.total_documents,
        tags = stats.tag_counts.len(),
        errors = stats.errors.len(),
        "vault scan complete"
    );
    stats
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

/// Time-windowed cache around [`scan_vault`]. Owned state with an injectable
/// clock, passed by reference to whoever reads or invalidates it.
pub struct ScanCache<C: Clock = SystemClock> {
    cached: Option<(VaultStats, Instant)>,
    ttl: Duration,
    clock: C,
}

impl ScanCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> ScanCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            cached: None,
            ttl,
            clock,
        }
    }

    pub fn state(&self) -> CacheState {
        match &self.cached {
            None => CacheState::Empty,
            Some((_, at)) => {
                if self.clock.now().duration_since(*at) < self.ttl {
                    CacheState::Fresh
                } else {
                    CacheState::Stale
                }
            }
        }
    }

    /// Serve from cache while fresh; otherwise walk and store.
    pub fn stats(&mut self, vault: &Vault) -> Result<VaultStats> {
        if let Some((stats, at)) = &self.cached {
            if self.clock.now().duration_since(*at) < self.ttl {
                debug!("scan served from cache");
                return Ok(stats.clone());
            }
        }
        self.refresh(vault)
    }

    /// Bypass the TTL check and walk unconditionally.
    pub fn refresh(&mut self, vault: &Vault) -> Result<VaultStats> {
        let stats = scan_vault(vault);
        self.cached = Some((stats.clone(), self.clock.now()));
        Ok(stats)
    }

    /// Called after every successful mutation: the next query walks again
    /// regardless of TTL.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct ManualClock {
        start: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }
    }

    fn scratch_vault() -> (tempfile::TempDir, Vault) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("vault");
        std::fs::create_dir_all(&root).expect("create vault root");
        let vault = Vault::open(&root).expect("open vault");
        (dir, vault)
    }

    fn write(vault: &Vault, rel: &str, content: &str) {
        let abs = vault.root().join(rel);
        std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
        std::fs::write(abs, content).unwrap();
    }

    #[test]
    fn scan_counts_folders_tags_and_fields() {
        let (_temp, vault) = scratch_vault();
        write(&vault, "root.md", "no metadata\n");
        write(
            &vault,
            "Projects/a.md",
            "---\ntitle: A\ntags:\n- alpha\n- beta\n---\n\nbody\n",
        );
        write(
            &vault,
            "Projects/b.md",
            "---\ntags:\n- alpha\nstatus: active\n---\n\nbody\n",
        );
        write(&vault, "Areas/c.md", "---\nbroken: [\n---\n\nbody\n");
        write(&vault, ".hidden/d.md", "---\ntags:\n- nope\n---\n\n\n");
        write(&vault, "Projects/image.png", "not a document");

        let stats = scan_vault(&vault);
        assert_eq!(stats.total_documents, 4);
        assert_eq!(stats.folder_counts["."], 1);
        assert_eq!(stats.folder_counts["Projects"], 2);
        assert_eq!(stats.folder_counts["Areas"], 1);
        assert_eq!(
            stats.total_documents,
            stats.folder_counts.values().sum::<usize>()
        );
        assert_eq!(stats.tag_counts["alpha"], 2);
        assert_eq!(stats.tag_counts["beta"], 1);
        assert!(!stats.tag_counts.contains_key("nope"));
        assert!(stats.field_names.contains("title"));
        assert!(stats.field_names.contains("status"));
        // The malformed block contributes nothing beyond counts.
        assert!(!stats.field_names.contains("broken"));
        assert!(stats.errors.is_empty());
    }

    #[test]
    fn cache_obeys_ttl_and_invalidation() {
        let (_temp, vault) = scratch_vault();
        write(&vault, "a.md", "---\ntitle: A\n---\n\n\n");

        let clock = ManualClock::new();
        let mut cache = ScanCache::with_clock(Duration::from_secs(30), clock.clone());
        assert_eq!(cache.state(), CacheState::Empty);

        let first = cache.stats(&vault).unwrap();
        assert_eq!(cache.state(), CacheState::Fresh);

        // Mutate behind the cache's back: a fresh query must not see it.
        write(&vault, "b.md", "body\n");
        clock.advance(Duration::from_secs(10));
        let second = cache.stats(&vault).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.total_documents, 1);

        // TTL expiry forces a walk.
        clock.advance(Duration::from_secs(25));
        assert_eq!(cache.state(), CacheState::Stale);
        let third = cache.stats(&vault).unwrap();
        assert_eq!(third.total_documents, 2);
        assert_eq!(cache.state(), CacheState::Fresh);

        // Invalidation empties the cache from any state.
        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Empty);
        write(&vault, "c.md", "body\n");
        let fourth = cache.stats(&vault).unwrap();
        assert_eq!(fourth.total_documents, 3);
    }

    #[test]
    fn refresh_bypasses_a_fresh_cache() {
        let (_temp, vault) = scratch_vault();
        write(&vault, "a.md", "body\n");

        let clock = ManualClock::new();
        let mut cache = ScanCache::with_clock(Duration::from_secs(60), clock.clone());
        assert_eq!(cache.stats(&vault).unwrap().total_documents, 1);

        write(&vault, "b.md", "body\n");
        assert_eq!(cache.stats(&vault).unwrap().total_documents, 1);
        assert_eq!(cache.refresh(&vault).unwrap().total_documents, 2);
    }
}
