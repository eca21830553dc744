//! Hunk and line level diff records.
//!
//! A change inside a file is addressed positionally: hunk index within the
//! [`FileDiff`], then line index within the [`DiffHunk`]. Positions are only
//! meaningful against the diff they were read from, so every hunk can also be
//! summarized by a [`HunkFingerprint`] that changes whenever its content does.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The diff of a single file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub hunks: Vec<DiffHunk>,
    pub is_binary: bool,
}

impl FileDiff {
    /// An empty, non-binary diff for `path`.
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hunks: Vec::new(),
            is_binary: false,
        }
    }

    /// Returns `true` if there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn hunk(&self, index: usize) -> Option<&DiffHunk> {
        self.hunks.get(index)
    }

    /// Total number of added lines across all hunks.
    pub fn additions(&self) -> usize {
        self.hunks.iter().map(DiffHunk::additions).sum()
    }

    /// Total number of removed lines across all hunks.
    pub fn deletions(&self) -> usize {
        self.hunks.iter().map(DiffHunk::deletions).sum()
    }
}

/// A contiguous region of changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Raw `@@ -a,b +c,d @@` header as produced by the engine.
    pub header: String,
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Formats the canonical `@@ -a,b +c,d @@` header for the given ranges.
    pub fn format_header(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> String {
        format!("@@ -{old_start},{old_lines} +{new_start},{new_lines} @@")
    }

    pub fn additions(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.line_type == LineType::Addition)
            .count()
    }

    pub fn deletions(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.line_type == LineType::Deletion)
            .count()
    }

    /// Indices of the lines that can be staged or discarded on their own.
    pub fn changed_line_indices(&self) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.line_type.is_change())
            .map(|(i, _)| i)
            .collect()
    }

    /// Content digest of the hunk.
    ///
    /// Covers the ranges and every typed line, so any mutation that shifts,
    /// grows or rewrites the hunk yields a different fingerprint.
    pub fn fingerprint(&self) -> HunkFingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.header.as_bytes());
        for n in [self.old_start, self.old_lines, self.new_start, self.new_lines] {
            hasher.update(&n.to_le_bytes());
        }
        for line in &self.lines {
            hasher.update(&[line.line_type.tag()]);
            hasher.update(&(line.content.len() as u64).to_le_bytes());
            hasher.update(line.content.as_bytes());
        }
        HunkFingerprint(*hasher.finalize().as_bytes())
    }
}

/// A single line of a hunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub content: String,
    pub line_type: LineType,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
}

impl DiffLine {
    pub fn context(content: impl Into<String>, old: u32, new: u32) -> Self {
        Self {
            content: content.into(),
            line_type: LineType::Context,
            old_lineno: Some(old),
            new_lineno: Some(new),
        }
    }

    pub fn addition(content: impl Into<String>, new: u32) -> Self {
        Self {
            content: content.into(),
            line_type: LineType::Addition,
            old_lineno: None,
            new_lineno: Some(new),
        }
    }

    pub fn deletion(content: impl Into<String>, old: u32) -> Self {
        Self {
            content: content.into(),
            line_type: LineType::Deletion,
            old_lineno: Some(old),
            new_lineno: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Context,
    Addition,
    Deletion,
    Header,
}

impl LineType {
    /// Returns `true` for added and removed lines.
    pub fn is_change(self) -> bool {
        matches!(self, Self::Addition | Self::Deletion)
    }

    fn tag(self) -> u8 {
        match self {
            Self::Context => b' ',
            Self::Addition => b'+',
            Self::Deletion => b'-',
            Self::Header => b'@',
        }
    }
}

/// BLAKE3 digest identifying the content of one hunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HunkFingerprint([u8; 32]);

impl HunkFingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for HunkFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HunkFingerprint({})", self.short_hex())
    }
}

impl fmt::Display for HunkFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
