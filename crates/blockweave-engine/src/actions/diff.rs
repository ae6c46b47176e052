//! Character diff between a span's stored and observed text.
//!
//! A plain Myers diff is ambiguous for edits inside repeated characters
//! (`"aaa"` -> `"aaaa"` could be an insert anywhere). When the caret offset is
//! known the edit is first explained as an insert or delete at the caret, and
//! only otherwise as a shortest edit script.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag};
use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

/// Upper bound on the general diff of one span
const DIFF_TIMEOUT: Duration = Duration::from_millis(500);

/// One run of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "text", rename_all = "kebab-case")]
pub enum DiffOp {
    Equal(String),
    Insert(String),
    Delete(String),
}

impl DiffOp {
    fn text(&self) -> &str {
        match self {
            DiffOp::Equal(text) | DiffOp::Insert(text) | DiffOp::Delete(text) => text,
        }
    }
}

/// Diff payload of an `update-span`, computed on first access and cached
#[derive(Clone)]
pub struct TextDiff {
    old: String,
    new: String,
    caret: Option<usize>,
    ops: OnceCell<Vec<DiffOp>>,
}

impl TextDiff {
    pub fn new(old: impl Into<String>, new: impl Into<String>, caret: Option<usize>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            caret,
            ops: OnceCell::new(),
        }
    }

    pub fn old(&self) -> &str {
        &self.old
    }

    pub fn new_text(&self) -> &str {
        &self.new
    }

    pub fn caret(&self) -> Option<usize> {
        self.caret
    }

    pub fn ops(&self) -> &[DiffOp] {
        self.ops
            .get_or_init(|| diff(&self.old, &self.new, self.caret))
    }

    pub fn is_computed(&self) -> bool {
        self.ops.get().is_some()
    }

    /// The diff as a delta over the old text
    pub fn to_delta(&self) -> Delta<RopeInfo> {
        let mut builder = Builder::new(self.old.len());
        let mut pos = 0;
        for op in self.ops() {
            match op {
                DiffOp::Equal(text) => pos += text.len(),
                DiffOp::Delete(text) => {
                    builder.delete(pos..pos + text.len());
                    pos += text.len();
                }
                DiffOp::Insert(text) => builder.replace(pos..pos, Rope::from(text)),
            }
        }
        builder.build()
    }
}

impl PartialEq for TextDiff {
    fn eq(&self, other: &Self) -> bool {
        self.old == other.old && self.new == other.new && self.caret == other.caret
    }
}

impl Eq for TextDiff {}

impl fmt::Debug for TextDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextDiff")
            .field("old", &self.old)
            .field("new", &self.new)
            .field("caret", &self.caret)
            .field("ops", &self.ops.get())
            .finish()
    }
}

/// Diff `old` into `new`, biased toward an edit at byte offset `caret`
pub fn diff(old: &str, new: &str, caret: Option<usize>) -> Vec<DiffOp> {
    if old == new {
        return compact(vec![DiffOp::Equal(old.to_string())]);
    }
    if let Some(caret) = caret
        && let Some(ops) = caret_edit(old, new, caret)
    {
        return ops;
    }
    shortest_script(old, new)
}

/// Character-level Myers diff; past the deadline the script may be longer
/// than minimal but still turns `old` into `new`
fn shortest_script(old: &str, new: &str) -> Vec<DiffOp> {
    let chars = similar::TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_chars(old, new);
    let ops = chars
        .iter_all_changes()
        .map(|change| {
            let text = change.value().to_string();
            match change.tag() {
                ChangeTag::Equal => DiffOp::Equal(text),
                ChangeTag::Delete => DiffOp::Delete(text),
                ChangeTag::Insert => DiffOp::Insert(text),
            }
        })
        .collect();
    compact(ops)
}

fn caret_edit(old: &str, new: &str, caret: usize) -> Option<Vec<DiffOp>> {
    match new.len().cmp(&old.len()) {
        Ordering::Greater => {
            let grown = new.len() - old.len();
            // caret still in front of the typed text, or already past it
            split_insert(old, new, caret)
                .or_else(|| caret.checked_sub(grown).and_then(|at| split_insert(old, new, at)))
        }
        Ordering::Less => {
            let shrunk = old.len() - new.len();
            // backspace removes before the caret, delete after it
            caret
                .checked_sub(shrunk)
                .and_then(|at| split_delete(old, new, at))
                .or_else(|| split_delete(old, new, caret))
        }
        Ordering::Equal => None,
    }
}

fn split_insert(old: &str, new: &str, at: usize) -> Option<Vec<DiffOp>> {
    let grown = new.len() - old.len();
    let before = old.get(..at)?;
    let after = old.get(at..)?;
    let inserted = new.get(at..at + grown)?;
    (new.get(..at)? == before && new.get(at + grown..)? == after).then(|| {
        compact(vec![
            DiffOp::Equal(before.to_string()),
            DiffOp::Insert(inserted.to_string()),
            DiffOp::Equal(after.to_string()),
        ])
    })
}

fn split_delete(old: &str, new: &str, at: usize) -> Option<Vec<DiffOp>> {
    let shrunk = old.len() - new.len();
    let removed = old.get(at..at + shrunk)?;
    (new.get(..at)? == old.get(..at)? && new.get(at..)? == old.get(at + shrunk..)?).then(|| {
        compact(vec![
            DiffOp::Equal(new[..at].to_string()),
            DiffOp::Delete(removed.to_string()),
            DiffOp::Equal(new[at..].to_string()),
        ])
    })
}

/// Merge adjacent runs, drop empty ones, and order each changed stretch as
/// deletes followed by inserts
fn compact(ops: Vec<DiffOp>) -> Vec<DiffOp> {
    let mut out: Vec<DiffOp> = Vec::new();
    let mut deleted = String::new();
    let mut inserted = String::new();

    let flush = |out: &mut Vec<DiffOp>, deleted: &mut String, inserted: &mut String| {
        if !deleted.is_empty() {
            out.push(DiffOp::Delete(std::mem::take(deleted)));
        }
        if !inserted.is_empty() {
            out.push(DiffOp::Insert(std::mem::take(inserted)));
        }
    };

    for op in ops {
        if op.text().is_empty() {
            continue;
        }
        match op {
            DiffOp::Delete(text) => deleted.push_str(&text),
            DiffOp::Insert(text) => inserted.push_str(&text),
            DiffOp::Equal(text) => {
                flush(&mut out, &mut deleted, &mut inserted);
                match out.last_mut() {
                    Some(DiffOp::Equal(prev)) => prev.push_str(&text),
                    _ => out.push(DiffOp::Equal(text)),
                }
            }
        }
    }
    flush(&mut out, &mut deleted, &mut inserted);
    out
}
