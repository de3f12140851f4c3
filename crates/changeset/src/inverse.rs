//! Undo changesets.

use crate::atext::AText;
use crate::attribs::{make_attribs, AttributeMap, Attribs};
use crate::builder::Builder;
use crate::codec::{parse_ops, Changeset};
use crate::cursor::CharCursor;
use crate::error::{malformed, ChangesetError, Result};
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

/// Walks the attribute runs of an attribution string.
struct RunCursor {
    runs: std::vec::IntoIter<Op>,
    current: Option<Op>,
}

impl RunCursor {
    fn new(attribution: &str) -> Result<Self> {
        Ok(RunCursor { runs: parse_ops(attribution)?.into_iter(), current: None })
    }

    /// Takes the next `n` characters as `(length, attributes)` pieces.
    fn take(&mut self, n: usize) -> Result<Vec<(usize, Attribs)>> {
        let mut pieces = Vec::new();
        let mut left = n;
        while left > 0 {
            let run = match self.current.as_mut() {
                Some(run) => run,
                None => self.current.insert(
                    self.runs
                        .next()
                        .ok_or_else(|| malformed("attribution is shorter than the changeset"))?,
                ),
            };
            let len = run.chars.min(left);
            pieces.push((len, run.attribs.clone()));
            run.chars -= len;
            if run.chars == 0 {
                self.current = None;
            }
            left -= len;
        }
        Ok(pieces)
    }
}

/// Computes the changeset that undoes `cs`, given the document `atext` that
/// `cs` applies to.
///
/// Applying `cs` and then its inverse restores both the text and the
/// attribution of `atext`.
pub fn inverse(cs: &Changeset, atext: &AText, pool: &mut AttributePool) -> Result<Changeset> {
    let len = atext.len();
    if len != cs.old_len {
        return Err(ChangesetError::LengthMismatch { expected: cs.old_len, actual: len });
    }
    cs.validate()?;
    cs.check_pool(pool)?;

    let mut text = CharCursor::new(&atext.text);
    let mut runs = RunCursor::new(&atext.attribs)?;
    let mut builder = Builder::new(cs.new_len);

    for op in &cs.ops {
        match op.opcode {
            OpCode::Keep if op.attribs.is_empty() => {
                text.skip(op.chars)?;
                runs.take(op.chars)?;
                builder.keep(op.chars, op.lines, Attribs::new());
            }
            OpCode::Keep => {
                let applied = AttributeMap::from_attribs(&op.attribs, pool)?;
                for (len, attribs) in runs.take(op.chars)? {
                    let piece = text.take(len)?;
                    let before = AttributeMap::from_attribs(&attribs, pool)?;
                    let back: Vec<(String, String)> = applied
                        .iter()
                        .filter_map(|(key, value)| {
                            let old = before.get(key).unwrap_or("");
                            (old != value).then(|| (key.to_string(), old.to_string()))
                        })
                        .collect();
                    let undo = make_attribs(OpCode::Keep, back, pool);
                    builder.keep_text(piece, undo);
                }
            }
            OpCode::Insert => {
                builder.remove(op.chars, op.lines);
            }
            OpCode::Remove => {
                for (len, attribs) in runs.take(op.chars)? {
                    builder.insert(text.take(len)?, attribs);
                }
            }
        }
    }
    builder.keep_text(text.take_rest(), Attribs::new());
    builder.build()
}
