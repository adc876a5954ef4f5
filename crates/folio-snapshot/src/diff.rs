//! Text comparison between a snapshot and the live document.

use similar::TextDiff;

/// Generate a unified diff (three lines of context) from `old` to `new`.
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_marks_changed_lines() {
        let diff = unified_diff(
            "line 1\nline 2\nline 3\n",
            "line 1\nmodified line\nline 3\n",
            "a/Chapter 1",
            "b/Chapter 1",
        );

        assert!(diff.starts_with("--- a/Chapter 1\n+++ b/Chapter 1\n"));
        assert!(diff.contains("-line 2"));
        assert!(diff.contains("+modified line"));
        assert!(diff.contains(" line 1"));
    }

    #[test]
    fn identical_text_has_no_hunks() {
        let diff = unified_diff("same\n", "same\n", "a", "b");
        assert!(!diff.contains("@@"));
    }
}
