use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::fields::{FieldMap, FieldValue};
use crate::{Error, NotePath, Result, Vault};

pub const STATUS_DEFAULT: &str = "active";

/// One ordered substring rule: first `pattern` found in the relative path
/// decides the value for its table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PathRule {
    pub pattern: String,
    pub value: String,
}

/// One body-keyword rule: the tag applies when the keyword appears (lowercase
/// substring match) anywhere in the body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub tag: String,
}

/// The heuristic vocabulary, kept as data so the domain-specific lists are
/// configuration rather than code. Each table is evaluated independently,
/// first match wins.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct InferenceRules {
    #[serde(default, rename = "category")]
    pub categories: Vec<PathRule>,
    #[serde(default, rename = "project")]
    pub projects: Vec<PathRule>,
    #[serde(default, rename = "doc_type")]
    pub doc_types: Vec<PathRule>,
    #[serde(default, rename = "keyword")]
    pub body_keywords: Vec<KeywordRule>,
}

impl Default for InferenceRules {
    fn default() -> Self {
        let path = |pattern: &str, value: &str| PathRule {
            pattern: pattern.into(),
            value: value.into(),
        };
        let kw = |keyword: &str, tag: &str| KeywordRule {
            keyword: keyword.into(),
            tag: tag.into(),
        };
        Self {
            categories: vec![
                path("Projects/", "project"),
                path("Areas/", "area"),
                path("Resources/", "resource"),
                path("Archive/", "archive"),
                path("Daily/", "daily"),
            ],
            projects: Vec::new(),
            doc_types: vec![
                path("meeting", "meeting-notes"),
                path("status", "status-report"),
                path("design", "design-doc"),
                path("Daily/", "daily-note"),
                path("readme", "reference"),
            ],
            body_keywords: vec![
                kw("rust", "rust"),
                kw("python", "python"),
                kw("docker", "docker"),
                kw("kubernetes", "kubernetes"),
                kw("terraform", "terraform"),
                kw("postgres", "database"),
                kw("sqlite", "database"),
                kw("linux", "linux"),
                kw("api", "api"),
            ],
        }
    }
}

impl InferenceRules {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::RulesToml(e.to_string()))
    }

    /// Load the rules file from inside the vault. A missing file falls back
    /// to the built-in vocabulary; a broken one does too, with a warning.
    pub fn load(vault: &Vault) -> Self {
        let path = vault.root().join(&vault.config().rules_path);
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "rules file not found; using built-in vocabulary");
                return Self::default();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read rules file");
                return Self::default();
            }
        };

        match Self::from_toml_str(&text) {
            Ok(rules) => {
                info!(path = %path.display(), "inference rules loaded");
                rules
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse rules file");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InferredMetadata {
    pub title: String,
    pub tags: BTreeSet<String>,
    pub category: Option<String>,
    pub project: Option<String>,
    pub doc_type: Option<String>,
    pub status: String,
    pub date: Option<String>,
}

fn first_match(rules: &[PathRule], haystack: &str) -> Option<String> {
    let haystack = haystack.to_lowercase();
    rules
        .iter()
        .find(|r| haystack.contains(&r.pattern.to_lowercase()))
        .map(|r| r.value.clone())
}

/// Derive metadata candidates from a document's location alone.
pub fn infer_from_path(rules: &InferenceRules, rel: &NotePath) -> InferredMetadata {
    let path_str = rel.as_str_lossy();
    let file_name = rel.file_name();

    let category = first_match(&rules.categories, &path_str);
    let project = first_match(&rules.projects, &path_str);
    let doc_type = first_match(&rules.doc_types, &path_str);

    let mut tags = BTreeSet::new();
    if let Some(c) = &category {
        tags.insert(c.clone());
    }
    if let Some(p) = &project {
        tags.insert(p.clone());
    }

    InferredMetadata {
        title: title_from_file_name(file_name),
        tags,
        category,
        project,
        doc_type,
        status: STATUS_DEFAULT.to_string(),
        date: date_from_file_name(file_name),
    }
}

/// Sorted, deduplicated union of `existing` and every keyword whose lowercase
/// form appears as a substring of the lowercased body.
pub fn infer_tags(rules: &InferenceRules, body: &str, existing: &[String]) -> Vec<String> {
    let body = body.to_lowercase();
    let mut out: BTreeSet<String> = existing.iter().cloned().collect();
    for rule in &rules.body_keywords {
        if body.contains(&rule.keyword.to_lowercase()) {
            out.insert(rule.tag.clone());
        }
    }
    out.into_iter().collect()
}

fn title_from_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    stem.replace('_', " ")
}

/// Extract a date from a filename containing exactly one run of 8 consecutive
/// digits, read as MMDDYYYY. No calendar validation: a malformed run passes
/// through as an invalid date, matching the documents this grew up with.
pub fn date_from_file_name(file_name: &str) -> Option<String> {
    let mut runs: Vec<&str> = Vec::new();
    let mut start = None;
    for (i, c) in file_name.char_indices() {
        if c.is_ascii_digit() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            runs.push(&file_name[s..i]);
        }
    }
    if let Some(s) = start {
        runs.push(&file_name[s..]);
    }

    let mut eights = runs.iter().filter(|r| r.len() == 8);
    let run = eights.next()?;
    if eights.next().is_some() {
        return None;
    }

    let (mm, rest) = run.split_at(2);
    let (dd, yyyy) = rest.split_at(2);
    Some(format!("{yyyy}-{mm}-{dd}"))
}

/// Repair a date whose year lost digits to leading zeros (`0024-03-05`) by
/// substituting the date embedded in the filename, when there is one.
pub fn fix_date(date: &str, file_name: &str) -> String {
    // Byte-wise on purpose: the date value comes straight out of a metadata
    // block and may hold arbitrary UTF-8.
    let bytes = date.as_bytes();
    let year_mangled = bytes.len() > 4
        && bytes[0] == b'0'
        && bytes[..4].iter().all(|b| b.is_ascii_digit())
        && bytes[4] == b'-';
    if !year_mangled {
        return date.to_string();
    }
    match date_from_file_name(file_name) {
        Some(fixed) => fixed,
        None => date.to_string(),
    }
}

const FILL_KEYS: [&str; 5] = ["title", "date", "category", "project", "docType"];

/// Combine an existing metadata block with inferred values. Existing values
/// always win; inference only fills gaps, so hand-authored metadata is never
/// clobbered. `tags` becomes the sorted, deduplicated union of both sides.
pub fn merge_metadata(existing: &FieldMap, inferred: &InferredMetadata) -> FieldMap {
    let mut out = existing.clone();

    let inferred_scalar = |key: &str| -> Option<String> {
        match key {
            "title" => Some(inferred.title.clone()).filter(|s| !s.is_empty()),
            "date" => inferred.date.clone(),
            "category" => inferred.category.clone(),
            "project" => inferred.project.clone(),
            "docType" => inferred.doc_type.clone(),
            _ => None,
        }
    };

    for key in FILL_KEYS {
        let present = out.get(key).is_some_and(|v| !v.is_empty_value());
        if present {
            continue;
        }
        if let Some(value) = inferred_scalar(key) {
            out.insert(key.to_string(), FieldValue::String(value));
        }
    }

    let status_present = out.get("status").is_some_and(|v| !v.is_empty_value());
    if !status_present && !inferred.status.is_empty() {
        out.insert(
            "status".to_string(),
            FieldValue::String(inferred.status.clone()),
        );
    }

    let mut tags: BTreeSet<String> = inferred.tags.iter().cloned().collect();
    if let Some(existing_tags) = existing.get("tags") {
        tags.extend(existing_tags.string_items());
    }
    if !tags.is_empty() {
        out.insert(
            "tags".to_string(),
            FieldValue::List(tags.into_iter().map(FieldValue::String).collect()),
        );
    }

    out
}
