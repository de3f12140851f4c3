//! Splices: the simplest edits, and changesets viewed as lists of them.

use crate::attribs::{make_attribs, Attribs};
use crate::builder::Builder;
use crate::codec::Changeset;
use crate::cursor::{split_chars, CharCursor};
use crate::error::Result;
use crate::op::OpCode;
use crate::pool::AttributePool;

/// Replacement of the old-text chars `start..end` by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Splice {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Splice { start, end, text: text.into() }
    }
}

/// Builds the changeset that removes `ndel` chars of `orig` at `start` and
/// inserts `ins` there with `attribs`.
///
/// `start` and `ndel` are clamped to the text.
pub fn make_splice(orig: &str, start: usize, ndel: usize, ins: &str, attribs: Attribs) -> Result<Changeset> {
    let len = orig.chars().count();
    let start = start.min(len);
    let ndel = ndel.min(len - start);
    let (before, rest) = split_chars(orig, start).unwrap_or((orig, ""));
    let (deleted, after) = split_chars(rest, ndel).unwrap_or((rest, ""));

    let mut builder = Builder::new(len);
    builder
        .keep_text(before, Attribs::new())
        .remove_text(deleted)
        .insert(ins, attribs)
        .keep_text(after, Attribs::new());
    builder.build()
}

/// [`make_splice`] with the inserted text's attributes given as pairs.
pub fn make_splice_with<K, V>(
    orig: &str,
    start: usize,
    ndel: usize,
    ins: &str,
    pairs: impl IntoIterator<Item = (K, V)>,
    pool: &mut AttributePool,
) -> Result<Changeset>
where
    K: Into<String>,
    V: Into<String>,
{
    let attribs = make_attribs(OpCode::Insert, pairs, pool);
    make_splice(orig, start, ndel, ins, attribs)
}

/// Lists the splices `cs` makes, in old-text positions. Adjacent removes and
/// inserts form one splice.
pub fn to_splices(cs: &Changeset) -> Result<Vec<Splice>> {
    let mut splices: Vec<Splice> = Vec::new();
    let mut bank = CharCursor::new(&cs.char_bank);
    let mut old_pos = 0;
    let mut in_splice = false;
    for op in &cs.ops {
        if op.opcode == OpCode::Keep {
            old_pos += op.chars;
            in_splice = false;
            continue;
        }
        if !in_splice {
            splices.push(Splice::new(old_pos, old_pos, ""));
            in_splice = true;
        }
        let Some(splice) = splices.last_mut() else { continue };
        match op.opcode {
            OpCode::Remove => {
                old_pos += op.chars;
                splice.end += op.chars;
            }
            OpCode::Insert => splice.text.push_str(bank.take(op.chars)?),
            OpCode::Keep => {}
        }
    }
    Ok(splices)
}

/// Maps the selection `start..end` of the old text through `cs`.
///
/// A range entirely replaced by a splice collapses to the end of the
/// inserted text, or to its start when `insertions_after`.
pub fn character_range_follow(
    cs: &Changeset,
    start: usize,
    end: usize,
    insertions_after: bool,
) -> Result<(usize, usize)> {
    let mut new_start = start as isize;
    let mut new_end = end as isize;
    let mut length_change = 0isize;
    for splice in to_splices(cs)? {
        let splice_start = splice.start as isize + length_change;
        let splice_end = splice.end as isize + length_change;
        let removed = splice_end - splice_start;
        let inserted = splice.text.chars().count() as isize;
        let delta = inserted - removed;

        if splice_start <= new_start && splice_end >= new_end {
            // Covers the whole range, including a collapsed one.
            new_start = if insertions_after { splice_start } else { splice_start + inserted };
            new_end = new_start;
        } else if splice_end <= new_start {
            new_start += delta;
            new_end += delta;
        } else if splice_start >= new_end {
            // After the range.
        } else if splice_start >= new_start && splice_end <= new_end {
            new_end += delta;
        } else if splice_end < new_end {
            // Overlaps the beginning.
            new_start = splice_start + inserted;
            new_end += delta;
        } else {
            // Overlaps the end.
            new_end = splice_start;
        }
        length_change += delta;
    }
    Ok((new_start.max(0) as usize, new_end.max(0) as usize))
}
