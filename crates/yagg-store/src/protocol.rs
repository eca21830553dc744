//! Hunk and line addressing for partial staging and discarding.
//!
//! A change inside a file is addressed by its position in the diff the user
//! is looking at: path, side (staged or not), hunk index and optionally line
//! indices within that hunk. Positions shift after every mutation of the
//! file, so an address may carry the [`HunkFingerprint`] of the hunk it was
//! taken from. Before anything is sent to the engine the address is checked
//! against the displayed diff and rejected if that hunk no longer matches.

use yagg_types::{DiffHunk, FileDiff, HunkFingerprint};

use crate::error::ValidationError;

/// Position of one hunk in a file diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HunkAddress {
    pub path: String,
    pub staged: bool,
    pub hunk_index: usize,
    pub fingerprint: Option<HunkFingerprint>,
}

impl HunkAddress {
    /// A purely positional address.
    pub fn new(path: impl Into<String>, staged: bool, hunk_index: usize) -> Self {
        Self {
            path: path.into(),
            staged,
            hunk_index,
            fingerprint: None,
        }
    }

    /// An address pinned to the content of `diff`'s hunk at `hunk_index`.
    pub fn pinned(diff: &FileDiff, staged: bool, hunk_index: usize) -> Self {
        Self {
            path: diff.path.clone(),
            staged,
            hunk_index,
            fingerprint: diff.hunk(hunk_index).map(DiffHunk::fingerprint),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: HunkFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Which lines of a hunk an operation applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineSelection {
    WholeHunk,
    /// Indices into the hunk's line list.
    Lines(Vec<usize>),
}

impl LineSelection {
    pub fn lines(&self) -> Option<&[usize]> {
        match self {
            Self::WholeHunk => None,
            Self::Lines(lines) => Some(lines),
        }
    }
}

/// Checks that `address` targets the side the operation works on.
pub fn check_side(address: &HunkAddress, expect_staged: bool) -> Result<(), ValidationError> {
    if address.staged == expect_staged {
        Ok(())
    } else {
        Err(ValidationError::WrongSide {
            path: address.path.clone(),
            index: address.hunk_index,
            staged: address.staged,
        })
    }
}

/// Validates `address` and `selection` against the diff on display.
///
/// `displayed` is the diff currently shown for the same path and side, if
/// any. Without one only the shape of the selection can be checked and the
/// address is passed to the engine as is.
pub fn validate(
    displayed: Option<&FileDiff>,
    address: &HunkAddress,
    selection: &LineSelection,
) -> Result<(), ValidationError> {
    if let LineSelection::Lines(lines) = selection {
        if lines.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
    }
    let Some(diff) = displayed else {
        return Ok(());
    };

    let hunk = diff
        .hunk(address.hunk_index)
        .ok_or_else(|| ValidationError::HunkOutOfRange {
            path: address.path.clone(),
            index: address.hunk_index,
            count: diff.hunks.len(),
        })?;
    if let Some(expected) = &address.fingerprint {
        if hunk.fingerprint() != *expected {
            return Err(ValidationError::StaleHunk {
                path: address.path.clone(),
                index: address.hunk_index,
            });
        }
    }
    if let Some(lines) = selection.lines() {
        validate_lines(hunk, lines)?;
    }
    Ok(())
}

/// Checks line indices against one hunk.
pub fn validate_lines(hunk: &DiffHunk, lines: &[usize]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptySelection);
    }
    if let Some(&index) = lines.iter().find(|&&i| i >= hunk.lines.len()) {
        return Err(ValidationError::LineOutOfRange {
            index,
            len: hunk.lines.len(),
        });
    }
    if !lines.iter().any(|&i| hunk.lines[i].line_type.is_change()) {
        return Err(ValidationError::NoChangedLines);
    }
    Ok(())
}
