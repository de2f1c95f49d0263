mod config;
mod error;
mod fields;
mod infer;
mod parse;
mod scan;
mod store;
mod vault;

pub use crate::config::VaultConfig;
pub use crate::error::{Error, Result};
pub use crate::fields::{FieldMap, FieldValue};
pub use crate::infer::{
    date_from_file_name, fix_date, infer_from_path, infer_tags, merge_metadata, InferenceRules,
    InferredMetadata, KeywordRule, PathRule,
};
pub use crate::parse::{
    decode_document, encode_document, parse_checklist, set_completed, ChecklistItem, DocumentParse,
};
pub use crate::scan::{CacheState, Clock, ScanCache, ScanFailure, SystemClock, VaultStats};
pub use crate::store::{ItemSelector, NoteStore};
pub use crate::vault::{is_within_root, NotePath, Vault};
