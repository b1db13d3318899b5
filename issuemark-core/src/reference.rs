//! Parsing of source-file references embedded in free-text issue bodies.
//!
//! A reference is a blob URL with a line fragment:
//! `https://<host>/<owner>/<repo>/blob/<ref>/<path>#L<N>` or `...#L<N>-L<M>`.
//! Only the first URL in a body counts. A query string before the fragment
//! (`README.md?plain=1#L5`) is matched but is not part of the path.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::FileReference;

static BLOB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[^/\s]+/[^/\s]+/[^/\s]+/blob/[^/\s]+/([^#?\s]+)(?:\?[^#\s]*)?#L(\d+)(?:-L(\d+))?")
        .expect("blob url pattern is valid")
});

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r?\n[ \t]*(?:\r?\n[ \t]*)+\r?\n").expect("blank run pattern is valid")
});

/// Returns the first blob URL with a line fragment found in `text`.
pub fn first_blob_url(text: &str) -> Option<&str> {
    BLOB_URL.find(text).map(|m| m.as_str())
}

/// Extracts the file reference from the first blob URL in `text`.
///
/// Returns `None` when there is no match, or when the first match carries a
/// zero or out-of-range line number. Later URLs are never consulted.
/// Ranges are passed through as written: `#L9-L3` yields start 9, end 3.
pub fn parse_reference(text: &str) -> Option<FileReference> {
    let caps = BLOB_URL.captures(text)?;
    let file_path = caps.get(1)?.as_str().to_owned();
    let start_line: u32 = caps.get(2)?.as_str().parse().ok()?;
    if start_line == 0 {
        return None;
    }
    let end_line = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => start_line,
    };
    Some(FileReference { file_path, start_line, end_line })
}

/// Returns `text` with its reference URL removed, for display.
///
/// Every occurrence of the first matched URL is cut out, spaces around each
/// cut are collapsed, runs of blank lines shrink to a single blank line, and
/// the result is trimmed. Text without a reference is only trimmed.
pub fn strip_reference(text: &str) -> String {
    let Some(url) = first_blob_url(text) else {
        return text.trim().to_owned();
    };

    let mut out = text.to_owned();
    while let Some(pos) = out.find(url) {
        let before = out[..pos].trim_end_matches([' ', '\t']);
        let after = out[pos + url.len()..].trim_start_matches([' ', '\t']);
        let joined = before.is_empty()
            || after.is_empty()
            || before.ends_with('\n')
            || after.starts_with(['\n', '\r']);
        let sep = if joined { "" } else { " " };
        out = format!("{before}{sep}{after}");
    }

    BLANK_RUN.replace_all(&out, "\n\n").trim().to_owned()
}
