use std::path::PathBuf;

use regex::Regex;
use tracing::{debug, info};

use crate::infer::{fix_date, infer_from_path, infer_tags, merge_metadata, InferenceRules};
use crate::parse::{
    decode_document, encode_document, parse_checklist, set_completed, ChecklistItem, DocumentParse,
};
use crate::scan::{CacheState, Clock, ScanCache, SystemClock, VaultStats};
use crate::{Error, FieldMap, NotePath, Result, Vault};

/// How to pick a checklist item for completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSelector {
    Id(usize),
    /// Case-insensitive substring of the item text.
    Text(String),
}

/// The mutating surface over a vault. Every write resolves its path through
/// the containment guard first and invalidates the scan cache after the file
/// hits disk; statistics queries go through the cache.
pub struct NoteStore<C: Clock = SystemClock> {
    vault: Vault,
    cache: ScanCache<C>,
    rules: InferenceRules,
}

impl NoteStore<SystemClock> {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let vault = Vault::open(root)?;
        let rules = InferenceRules::load(&vault);
        let cache = ScanCache::new(vault.config().scan_ttl);
        Ok(Self {
            vault,
            cache,
            rules,
        })
    }
}

impl<C: Clock> NoteStore<C> {
    pub fn with_parts(vault: Vault, cache: ScanCache<C>, rules: InferenceRules) -> Self {
        Self {
            vault,
            cache,
            rules,
        }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn rules(&self) -> &InferenceRules {
        &self.rules
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    // --- documents ---

    pub fn read_note(&self, rel: &NotePath) -> Result<String> {
        let abs = self.vault.guarded_abs(rel)?;
        match std::fs::read_to_string(&abs) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(abs)),
            Err(err) => Err(Error::io(&abs, err)),
        }
    }

    pub fn create_note(&mut self, rel: &NotePath, content: &str) -> Result<()> {
        let abs = self.vault.guarded_abs(rel)?;
        if abs.exists() {
            return Err(Error::AlreadyExists(abs));
        }
        self.write_abs(&abs, content)?;
        info!(path = %rel.as_str_lossy(), "document created");
        Ok(())
    }

    pub fn write_note(&mut self, rel: &NotePath, content: &str) -> Result<()> {
        let abs = self.vault.guarded_abs(rel)?;
        self.write_abs(&abs, content)?;
        debug!(path = %rel.as_str_lossy(), "document written");
        Ok(())
    }

    pub fn delete_note(&mut self, rel: &NotePath) -> Result<()> {
        let abs = self.vault.guarded_abs(rel)?;
        if !abs.exists() {
            return Err(Error::NotFound(abs));
        }
        std::fs::remove_file(&abs).map_err(|e| Error::io(&abs, e))?;
        self.cache.invalidate();
        info!(path = %rel.as_str_lossy(), "document deleted");
        Ok(())
    }

    /// Rename a document, then rewrite wikilinks (`[[old stem]]`, aliases and
    /// heading suffixes preserved) across every other document in the tree.
    pub fn move_note(&mut self, from: &NotePath, to: &NotePath) -> Result<usize> {
        let from_abs = self.vault.guarded_abs(from)?;
        let to_abs = self.vault.guarded_abs(to)?;
        if !from_abs.exists() {
            return Err(Error::NotFound(from_abs));
        }
        if to_abs.exists() {
            return Err(Error::AlreadyExists(to_abs));
        }
        if let Some(parent) = to_abs.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::rename(&from_abs, &to_abs).map_err(|e| Error::io(&from_abs, e))?;
        self.cache.invalidate();

        let rewritten = self.rewrite_wikilinks(from.file_stem(), to.file_stem(), to)?;
        info!(
            from = %from.as_str_lossy(),
            to = %to.as_str_lossy(),
            rewritten,
            "document moved"
        );
        Ok(rewritten)
    }

    /// Fill metadata gaps from path and body heuristics, repair a mangled
    /// date, and rewrite the document with its full sorted metadata block.
    /// Hand-authored values are never overwritten.
    pub fn enrich_note(&mut self, rel: &NotePath) -> Result<FieldMap> {
        let text = self.read_note(rel)?;
        let (existing, body) = match decode_document(&text) {
            DocumentParse::Valid { block, body } => (block, body),
            // Absent and malformed are read the same: no metadata.
            DocumentParse::Absent | DocumentParse::Malformed { .. } => {
                (FieldMap::new(), text.clone())
            }
        };

        let inferred = infer_from_path(&self.rules, rel);
        let mut merged = merge_metadata(&existing, &inferred);

        if let Some(date) = merged.get("date").and_then(|v| v.as_str()) {
            let fixed = fix_date(date, rel.file_name());
            if fixed != date {
                merged.insert("date".into(), crate::FieldValue::String(fixed));
            }
        }

        let existing_tags = merged
            .get("tags")
            .map(|v| v.string_items())
            .unwrap_or_default();
        let tags = infer_tags(&self.rules, &body, &existing_tags);
        if !tags.is_empty() {
            merged.insert(
                "tags".into(),
                crate::FieldValue::List(
                    tags.into_iter().map(crate::FieldValue::String).collect(),
                ),
            );
        }

        let updated = encode_document(&merged, &body);
        self.write_note(rel, &updated)?;
        info!(path = %rel.as_str_lossy(), "metadata enriched");
        Ok(merged)
    }

    // --- checklist ---

    fn checklist_rel(&self) -> Result<NotePath> {
        NotePath::try_from(self.vault.config().checklist_path.as_path())
    }

    pub fn checklist_items(&self) -> Result<Vec<ChecklistItem>> {
        let rel = self.checklist_rel()?;
        match self.read_note(&rel) {
            Ok(text) => Ok(parse_checklist(&text)),
            Err(Error::NotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    pub fn add_checklist_item(&mut self, text: &str, tags: &[String]) -> Result<ChecklistItem> {
        let rel = self.checklist_rel()?;
        let mut content = match self.read_note(&rel) {
            Ok(c) => c,
            Err(Error::NotFound(_)) => String::new(),
            Err(err) => return Err(err),
        };

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        let mut line = format!("- [ ] {}", text.trim());
        for tag in tags {
            line.push_str(&format!(" #{}", tag.trim_start_matches('#')));
        }
        content.push_str(&line);
        content.push('\n');

        self.write_note(&rel, &content)?;
        let items = parse_checklist(&content);
        let added = items
            .into_iter()
            .next_back()
            .ok_or_else(|| Error::Internal("checklist append produced no item".into()))?;
        info!(id = added.id, text = %added.text, "checklist item added");
        Ok(added)
    }

    /// Mark one item done. A text selector matching more than one item mutates
    /// nothing and reports the candidates.
    pub fn complete_item(&mut self, selector: &ItemSelector) -> Result<ChecklistItem> {
        let rel = self.checklist_rel()?;
        let content = self.read_note(&rel)?;
        let items = parse_checklist(&content);

        let matched: Vec<&ChecklistItem> = match selector {
            ItemSelector::Id(id) => items.iter().filter(|i| i.id == *id).collect(),
            ItemSelector::Text(needle) => {
                let needle = needle.to_lowercase();
                items
                    .iter()
                    .filter(|i| i.text.to_lowercase().contains(&needle))
                    .collect()
            }
        };

        let item = match matched.as_slice() {
            [] => {
                return Err(Error::NoChecklistMatch(match selector {
                    ItemSelector::Id(id) => format!("id {id}"),
                    ItemSelector::Text(t) => format!("text {t:?}"),
                }))
            }
            [one] => (*one).clone(),
            many => {
                return Err(Error::AmbiguousChecklistMatch {
                    candidates: many
                        .iter()
                        .map(|i| format!("{}: {}", i.id, i.text))
                        .collect(),
                })
            }
        };

        let updated = set_completed(&content, item.source_line, true).ok_or_else(|| {
            Error::Internal(format!(
                "checklist line {} changed underfoot",
                item.source_line
            ))
        })?;
        self.write_note(&rel, &updated)?;
        info!(id = item.id, text = %item.text, "checklist item completed");
        Ok(ChecklistItem {
            completed: true,
            ..item
        })
    }

    // --- daily notes ---

    /// Create `Daily/<date>.md` from the template unless it already exists.
    pub fn daily_note(&mut self, date: &str) -> Result<NotePath> {
        let rel_path = self.vault.config().daily_dir.join(format!("{date}.md"));
        let rel = NotePath::try_from(rel_path.as_path())?;
        let abs = self.vault.guarded_abs(&rel)?;
        if abs.exists() {
            return Ok(rel);
        }

        let block = daily_template_block(date);
        let content = encode_document(&block, "## Notes\n\n## Tasks\n\n- [ ]\n");
        self.write_abs(&abs, &content)?;
        info!(path = %rel.as_str_lossy(), "daily note created");
        Ok(rel)
    }

    // --- statistics ---

    pub fn stats(&mut self) -> Result<VaultStats> {
        self.cache.stats(&self.vault)
    }

    pub fn stats_fresh(&mut self) -> Result<VaultStats> {
        self.cache.refresh(&self.vault)
    }

    // --- internals ---

    fn write_abs(&mut self, abs: &std::path::Path, content: &str) -> Result<()> {
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(abs, content).map_err(|e| Error::io(abs, e))?;
        self.cache.invalidate();
        Ok(())
    }

    fn rewrite_wikilinks(
        &mut self,
        old_stem: &str,
        new_stem: &str,
        skip: &NotePath,
    ) -> Result<usize> {
        if old_stem.is_empty() || old_stem == new_stem {
            return Ok(0);
        }
        let pattern = format!(r"\[\[{}([|#\]])", regex::escape(old_stem));
        let re = Regex::new(&pattern)
            .map_err(|e| Error::Internal(format!("wikilink pattern: {e}")))?;
        let replacement = format!("[[{new_stem}$1");

        let mut rewritten = 0usize;
        let paths: Vec<NotePath> = walkdir::WalkDir::new(self.vault.root())
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.vault.to_rel(e.path()).ok())
            .filter(|rel| self.vault.is_document_rel(rel.as_path()) && rel != skip)
            .collect();

        for rel in paths {
            let text = match self.read_note(&rel) {
                Ok(t) => t,
                Err(_) => continue,
            };
            if !re.is_match(&text) {
                continue;
            }
            let updated = re.replace_all(&text, replacement.as_str()).to_string();
            self.write_note(&rel, &updated)?;
            rewritten += 1;
        }
        Ok(rewritten)
    }
}

fn daily_template_block(date: &str) -> FieldMap {
    let mut block = FieldMap::new();
    block.insert("title".into(), crate::FieldValue::String(date.to_string()));
    block.insert("date".into(), crate::FieldValue::String(date.to_string()));
    block.insert(
        "docType".into(),
        crate::FieldValue::String("daily-note".into()),
    );
    block.insert(
        "status".into(),
        crate::FieldValue::String(crate::infer::STATUS_DEFAULT.into()),
    );
    block.insert(
        "tags".into(),
        crate::FieldValue::List(vec![crate::FieldValue::String("daily".into())]),
    );
    block
}
