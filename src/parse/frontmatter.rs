use crate::fields::{field_value_to_yaml, yaml_mapping_to_field_map, FieldMap};
#[cfg(test)]
use crate::fields::FieldValue;

/// Result of splitting a document into its metadata block and body.
///
/// `Malformed` keeps the parse error around for callers that want to report
/// it; the default `decode_document(..).into_block_body()` view collapses it
/// into "no metadata", so a broken block is read the same as an absent one.
#[derive(Debug, Clone)]
pub enum DocumentParse {
    Absent,
    Valid { block: FieldMap, body: String },
    Malformed { error: String },
}

impl DocumentParse {
    pub fn into_block_body(self) -> Option<(FieldMap, String)> {
        match self {
            DocumentParse::Valid { block, body } => Some((block, body)),
            _ => None,
        }
    }
}

/// Split a document into metadata block and body.
///
/// Returns `Absent` unless the text begins with a `---` fence line. The block
/// between the fences is parsed as a restricted mapping (scalars, sequences,
/// one level of nested mappings); anything serde_yaml rejects, or a non-mapping
/// top level, is `Malformed`.
pub fn decode_document(text: &str) -> DocumentParse {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return DocumentParse::Absent;
    };

    let mut idx = 0usize;
    let bytes = rest.as_bytes();
    while idx < bytes.len() {
        let line_end = match bytes[idx..].iter().position(|b| *b == b'\n') {
            Some(off) => idx + off + 1,
            None => bytes.len(),
        };
        let line = &rest[idx..line_end];
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let block_text = &rest[..idx];
            let body = strip_one_blank_line(&rest[line_end..]);
            if block_text.trim().is_empty() {
                return DocumentParse::Valid {
                    block: FieldMap::new(),
                    body: body.to_string(),
                };
            }
            return match serde_yaml::from_str::<serde_yaml::Value>(block_text) {
                Ok(v) => match yaml_mapping_to_field_map(&v) {
                    Some(block) => DocumentParse::Valid {
                        block,
                        body: body.to_string(),
                    },
                    None => DocumentParse::Malformed {
                        error: "metadata block is not a mapping".to_string(),
                    },
                },
                Err(err) => DocumentParse::Malformed {
                    error: err.to_string(),
                },
            };
        }
        idx = line_end;
    }

    DocumentParse::Malformed {
        error: "metadata fence not closed".to_string(),
    }
}

/// Re-serialize a metadata block and body into document text.
///
/// Framing is fixed: opening fence, every key in sorted order, closing fence,
/// exactly one blank line, body verbatim. External tools rely on this shape
/// byte-for-byte.
pub fn encode_document(block: &FieldMap, body: &str) -> String {
    let mut mapping = serde_yaml::Mapping::new();
    for (k, v) in block {
        mapping.insert(serde_yaml::Value::String(k.clone()), field_value_to_yaml(v));
    }
    // BTreeMap iteration gives sorted keys; serde_yaml preserves the order.
    let yaml = if block.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(&serde_yaml::Value::Mapping(mapping)).unwrap_or_default()
    };
    format!("---\n{yaml}---\n\n{body}")
}

fn strip_one_blank_line(body: &str) -> &str {
    body.strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body)
}

#[cfg(test)]
pub(crate) fn field_map_with(entries: &[(&str, FieldValue)]) -> FieldMap {
    let mut out = FieldMap::new();
    for (k, v) in entries {
        out.insert(k.to_string(), v.clone());
    }
    out
}
