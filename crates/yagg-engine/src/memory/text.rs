//! Line diffs and hunk application for the in-memory engine.
//!
//! Uses the `similar` crate (Myers diff) to produce hunks with three lines of
//! context, and applies single hunks, or a subset of their lines, back onto
//! text the way `git add -p` / `git checkout -p` do.

use similar::{ChangeTag, TextDiff};
use yagg_types::{DiffHunk, DiffLine, FileDiff, LineType};

const CONTEXT_LINES: usize = 3;

/// Which side of the hunk the text being patched corresponds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Patch the old side towards the new side (staging).
    Forward,
    /// Patch the new side back towards the old side (unstaging, discarding).
    Reverse,
}

/// Computes the diff between two optional file contents.
pub(crate) fn diff_text(path: &str, old: Option<&str>, new: Option<&str>) -> FileDiff {
    let old = old.unwrap_or("");
    let new = new.unwrap_or("");

    if old.contains('\0') || new.contains('\0') {
        return FileDiff {
            path: path.to_string(),
            hunks: Vec::new(),
            is_binary: old != new,
        };
    }
    if old == new {
        return FileDiff::empty(path);
    }

    let text_diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start + 1;
        let new_start = first.new_range().start + 1;
        let old_count = last.old_range().end - first.old_range().start;
        let new_count = last.new_range().end - first.new_range().start;

        let mut lines = Vec::new();
        for op in &group {
            for change in text_diff.iter_changes(op) {
                let content = change.value().trim_end_matches('\n').to_string();
                let old_lineno = change.old_index().map(|i| i as u32 + 1);
                let new_lineno = change.new_index().map(|i| i as u32 + 1);
                let line_type = match change.tag() {
                    ChangeTag::Equal => LineType::Context,
                    ChangeTag::Delete => LineType::Deletion,
                    ChangeTag::Insert => LineType::Addition,
                };
                lines.push(DiffLine {
                    content,
                    line_type,
                    old_lineno,
                    new_lineno,
                });
            }
        }

        let (old_start, old_count) = (old_start as u32, old_count as u32);
        let (new_start, new_count) = (new_start as u32, new_count as u32);
        hunks.push(DiffHunk {
            header: DiffHunk::format_header(old_start, old_count, new_start, new_count),
            old_start,
            old_lines: old_count,
            new_start,
            new_lines: new_count,
            lines,
        });
    }

    FileDiff {
        path: path.to_string(),
        hunks,
        is_binary: false,
    }
}

/// Applies `hunk` to `base`, optionally restricted to `selection` line indices.
///
/// Unselected additions are dropped and unselected deletions are kept, so the
/// result contains exactly the selected part of the change.
pub(crate) fn apply_hunk(
    base: &str,
    hunk: &DiffHunk,
    direction: Direction,
    selection: Option<&[usize]>,
) -> String {
    let base_lines: Vec<&str> = base.lines().collect();
    let (start, count) = match direction {
        Direction::Forward => (hunk.old_start, hunk.old_lines),
        Direction::Reverse => (hunk.new_start, hunk.new_lines),
    };
    let from = (start as usize).saturating_sub(1).min(base_lines.len());
    let to = (from + count as usize).min(base_lines.len());

    let mut out: Vec<&str> = base_lines[..from].to_vec();
    for (i, line) in hunk.lines.iter().enumerate() {
        let selected = selection.map_or(true, |s| s.contains(&i));
        let keep = match (line.line_type, direction) {
            (LineType::Context, _) => true,
            (LineType::Header, _) => false,
            (LineType::Addition, Direction::Forward) => selected,
            (LineType::Deletion, Direction::Forward) => !selected,
            (LineType::Addition, Direction::Reverse) => !selected,
            (LineType::Deletion, Direction::Reverse) => selected,
        };
        if keep {
            out.push(&line.content);
        }
    }
    out.extend_from_slice(&base_lines[to..]);

    if out.is_empty() {
        String::new()
    } else {
        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line{i}\n")).collect()
    }

    fn replace_line(text: &str, lineno: usize, with: &str) -> String {
        text.lines()
            .enumerate()
            .map(|(i, l)| if i + 1 == lineno { format!("{with}\n") } else { format!("{l}\n") })
            .collect()
    }

    #[test]
    fn identical_text_has_no_hunks() {
        let diff = diff_text("a.txt", Some("x\ny\n"), Some("x\ny\n"));
        assert!(diff.is_empty());
        assert!(!diff.is_binary);
    }

    #[test]
    fn new_file_is_all_additions() {
        let diff = diff_text("a.txt", None, Some("one\ntwo\n"));
        assert_eq!(diff.hunks.len(), 1);
        assert_eq!(diff.additions(), 2);
        assert_eq!(diff.hunks[0].header, "@@ -1,0 +1,2 @@");
    }

    #[test]
    fn binary_content_is_flagged() {
        let diff = diff_text("img.png", Some("\0\x01"), Some("\0\x02"));
        assert!(diff.is_binary);
        assert!(diff.hunks.is_empty());
    }

    #[test]
    fn distant_changes_form_separate_hunks() {
        let old = numbered(30);
        let new = replace_line(&replace_line(&replace_line(&old, 2, "A"), 15, "B"), 28, "C");
        let diff = diff_text("f.txt", Some(&old), Some(&new));
        assert_eq!(diff.hunks.len(), 3);
        assert!(diff.hunks.iter().all(|h| h.additions() == 1 && h.deletions() == 1));
    }

    #[test]
    fn line_numbers_are_one_based() {
        let diff = diff_text("f.txt", Some("a\nb\nc\n"), Some("a\nX\nc\n"));
        let hunk = &diff.hunks[0];
        let removed = hunk.lines.iter().find(|l| l.line_type == LineType::Deletion).unwrap();
        let added = hunk.lines.iter().find(|l| l.line_type == LineType::Addition).unwrap();
        assert_eq!(removed.old_lineno, Some(2));
        assert_eq!(added.new_lineno, Some(2));
    }

    #[test]
    fn forward_whole_hunk_reaches_new_side() {
        let old = numbered(30);
        let new = replace_line(&replace_line(&old, 2, "A"), 28, "C");
        let diff = diff_text("f.txt", Some(&old), Some(&new));

        let patched = apply_hunk(&old, &diff.hunks[1], Direction::Forward, None);
        assert_eq!(patched, replace_line(&old, 28, "C"));
    }

    #[test]
    fn reverse_whole_hunk_restores_old_side() {
        let old = numbered(30);
        let new = replace_line(&replace_line(&old, 2, "A"), 28, "C");
        let diff = diff_text("f.txt", Some(&old), Some(&new));

        let restored = apply_hunk(&new, &diff.hunks[0], Direction::Reverse, None);
        assert_eq!(restored, replace_line(&old, 28, "C"));
    }

    #[test]
    fn forward_selection_takes_only_chosen_lines() {
        let diff = diff_text("f.txt", Some("a\nb\n"), Some("a\nb\nc\nd\n"));
        let hunk = &diff.hunks[0];
        let first_added = hunk
            .lines
            .iter()
            .position(|l| l.line_type == LineType::Addition)
            .unwrap();

        let patched = apply_hunk("a\nb\n", hunk, Direction::Forward, Some(&[first_added]));
        assert_eq!(patched, "a\nb\nc\n");
    }

    #[test]
    fn reverse_selection_keeps_unchosen_additions() {
        let new = "a\nb\nc\nd\n";
        let diff = diff_text("f.txt", Some("a\nb\n"), Some(new));
        let hunk = &diff.hunks[0];
        let last_added = hunk
            .lines
            .iter()
            .rposition(|l| l.line_type == LineType::Addition)
            .unwrap();

        let patched = apply_hunk(new, hunk, Direction::Reverse, Some(&[last_added]));
        assert_eq!(patched, "a\nb\nc\n");
    }

    #[test]
    fn removing_everything_yields_empty_text() {
        let diff = diff_text("f.txt", Some("only\n"), None);
        let patched = apply_hunk("only\n", &diff.hunks[0], Direction::Forward, None);
        assert_eq!(patched, "");
    }
}
