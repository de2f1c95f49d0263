pub(crate) mod checklist;
pub(crate) mod frontmatter;

pub use checklist::{parse_checklist, set_completed, ChecklistItem};
pub use frontmatter::{decode_document, encode_document, DocumentParse};
