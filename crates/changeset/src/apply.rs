//! Applying changesets to text, attribution strings and attributed text.
//!
//! All functions are pure: the input is never modified and a new value is
//! returned.

use crate::atext::AText;
use crate::codec::{parse_ops, serialize_ops, Changeset};
use crate::cursor::{apply_zip, slicer_zipper, CharCursor};
use crate::error::{malformed, ChangesetError, Result};
use crate::op::OpCode;
use crate::pool::AttributePool;

fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

/// Applies `cs` to `text`.
///
/// Fails with [`ChangesetError::LengthMismatch`] if `text` is not `old_len`
/// characters long, and with [`ChangesetError::Malformed`] when an op's
/// newline count disagrees with the characters it covers.
pub fn apply_to_text(cs: &Changeset, text: &str) -> Result<String> {
    let len = text.chars().count();
    if len != cs.old_len {
        return Err(ChangesetError::LengthMismatch { expected: cs.old_len, actual: len });
    }
    let mut bank = CharCursor::new(&cs.char_bank);
    let mut old = CharCursor::new(text);
    let mut out = String::with_capacity(text.len() + cs.char_bank.len());
    for op in &cs.ops {
        let chunk = match op.opcode {
            OpCode::Insert => bank.take(op.chars)?,
            OpCode::Keep | OpCode::Remove => old.take(op.chars)?,
        };
        if count_newlines(chunk) != op.lines {
            return Err(malformed(format!(
                "newline count is wrong in op {}{}: expected {}",
                op.opcode.symbol(),
                op.chars,
                op.lines
            )));
        }
        if op.opcode != OpCode::Remove {
            out.push_str(chunk);
        }
    }
    out.push_str(old.take_rest());
    Ok(out)
}

/// Applies `cs` to an attribution string (the `attribs` of an [`AText`]).
pub fn apply_to_attribution(cs: &Changeset, attribution: &str, pool: &mut AttributePool) -> Result<String> {
    let att_ops = parse_ops(attribution)?;
    let ops = apply_zip(att_ops, cs.ops.iter().cloned(), |att, op| {
        slicer_zipper(att, op, pool)
    })?;
    Ok(serialize_ops(&ops))
}

/// Applies `cs` to `atext`, producing a new document snapshot.
///
/// Fails with [`ChangesetError::PoolResolution`] before touching the text if
/// `cs` references an attribute missing from `pool`, and with
/// [`ChangesetError::Malformed`] if `atext.attribs` does not cover the text.
pub fn apply_to_atext(cs: &Changeset, atext: &AText, pool: &mut AttributePool) -> Result<AText> {
    cs.check_pool(pool)?;
    atext.validate()?;
    Ok(AText {
        text: apply_to_text(cs, &atext.text)?,
        attribs: apply_to_attribution(cs, &atext.attribs, pool)?,
    })
}
