use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    /// 1-based, assigned in document order over checklist lines only.
    pub id: usize,
    /// Line text with tag tokens stripped and trimmed.
    pub text: String,
    pub completed: bool,
    /// Tags in order of first appearance; duplicates preserved.
    pub tags: Vec<String>,
    /// Leading indentation units (tabs or spaces, one file uses one kind).
    pub indent: usize,
    /// 1-based line number in the source text.
    pub source_line: usize,
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([ \t]*)- \[([ xX])\](.*)$").expect("checklist line regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)").expect("tag regex"))
}

fn tag_strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\w+ ?").expect("tag strip regex"))
}

/// Parse every checklist line in `text`. Non-matching lines are skipped, not
/// an error. The full sequence is always returned; filtering by status or tag
/// is a read-time view so re-serialization can rewrite exactly one line.
pub fn parse_checklist(text: &str) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    for (ix, line) in text.lines().enumerate() {
        let Some(caps) = line_re().captures(line) else {
            continue;
        };
        let indent = caps.get(1).map_or(0, |m| m.as_str().chars().count());
        let mark = caps.get(2).map_or(" ", |m| m.as_str());
        let rest = caps.get(3).map_or("", |m| m.as_str());

        let tags: Vec<String> = tag_re()
            .captures_iter(rest)
            .map(|c| c[1].to_string())
            .collect();
        let text = tag_strip_re().replace_all(rest, "").trim().to_string();

        items.push(ChecklistItem {
            id: items.len() + 1,
            text,
            completed: mark.eq_ignore_ascii_case("x"),
            tags,
            indent,
            source_line: ix + 1,
        });
    }
    items
}

/// Rewrite exactly one line's bracket character, leaving every other byte of
/// the document alone. Returns `None` when `source_line` does not exist or is
/// not a checklist line.
pub fn set_completed(text: &str, source_line: usize, completed: bool) -> Option<String> {
    if source_line == 0 {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut rewritten = false;
    for (ix, segment) in text.split_inclusive('\n').enumerate() {
        if ix + 1 != source_line {
            out.push_str(segment);
            continue;
        }

        let line = segment.trim_end_matches(['\r', '\n']);
        let ending = &segment[line.len()..];
        let caps = line_re().captures(line)?;
        let prefix_len = caps.get(1).map_or(0, |m| m.as_str().len()) + "- [".len();
        let mark = if completed { 'x' } else { ' ' };
        out.push_str(&line[..prefix_len]);
        out.push(mark);
        out.push_str(&line[prefix_len + 1..]);
        out.push_str(ending);
        rewritten = true;
    }

    rewritten.then_some(out)
}
