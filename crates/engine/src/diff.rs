//! Unified diffs for dry runs and reports.

use std::path::Path;

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

/// Unified diff of `old` against `new`, headed `a/<path>` and `b/<path>`.
/// Empty when the texts are equal.
pub fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let name = path.to_string_lossy().replace('\\', "/");
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{}", name), &format!("b/{}", name))
        .to_string()
}

pub fn diff_stats(old: &str, new: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    for change in TextDiff::from_lines(old, new).iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.added += 1,
            ChangeTag::Delete => stats.removed += 1,
            ChangeTag::Equal => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_texts_have_no_diff() {
        assert_eq!(unified_diff(Path::new("a.jsx"), "x\n", "x\n"), "");
    }

    #[test]
    fn diff_has_headers_and_hunks() {
        let d = unified_diff(
            Path::new("src/App.jsx"),
            "one\ntwo\nthree\n",
            "one\n2\nthree\n",
        );
        assert!(d.starts_with("--- a/src/App.jsx\n+++ b/src/App.jsx\n"));
        assert!(d.contains("-two\n"));
        assert!(d.contains("+2\n"));
        assert_eq!(
            diff_stats("one\ntwo\nthree\n", "one\n2\nthree\n"),
            DiffStats {
                added: 1,
                removed: 1
            }
        );
    }
}
