//! Operational transformation of concurrent changesets.
//!
//! Given two changesets `a` and `b` made against the same document, `follow`
//! rewrites one of them so that it applies after the other. Applying `a` and
//! then `follow(a, b)` yields the same document as applying `b` and then
//! `follow(b, a)`, as long as the two calls break insert ties in opposite
//! directions.

use std::ops::Not;

use crate::attribs::{attribute_tester, follow_attributes, AttributeTester};
use crate::codec::Changeset;
use crate::cursor::{apply_zip, consume, CharCursor};
use crate::error::{malformed, ChangesetError, Result};
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

/// Which side's insert goes first when two changesets insert at the same
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Left,
    Right,
}

impl Not for Priority {
    type Output = Priority;

    fn not(self) -> Priority {
        match self {
            Priority::Left => Priority::Right,
            Priority::Right => Priority::Left,
        }
    }
}

/// Rewrites `a` so that it applies after `b`.
///
/// With [`Priority::Left`], text inserted by `a` at the same position as
/// text inserted by `b` ends up before it. `transform(a, b, p)` and
/// `transform(b, a, !p)` converge.
///
/// An edit transformed against an identical concurrent edit becomes the
/// identity: the change it describes has already been made.
pub fn transform(a: &Changeset, b: &Changeset, priority: Priority, pool: &mut AttributePool) -> Result<Changeset> {
    if a == b {
        a.validate()?;
        return Ok(Changeset::identity(b.new_len));
    }
    follow(b, a, priority == Priority::Left, pool)
}

/// Rewrites `cs2` so that it applies after `cs1`. Both must share the same
/// base length.
///
/// Where both changesets insert at the same position, inserts marked with
/// `insertorder=first` win, then inserts that do not start with a newline,
/// then `cs1`'s insert unless `reverse_insert_order` is set.
pub fn follow(
    cs1: &Changeset,
    cs2: &Changeset,
    reverse_insert_order: bool,
    pool: &mut AttributePool,
) -> Result<Changeset> {
    if cs1.old_len != cs2.old_len {
        return Err(ChangesetError::IncompatibleBaseLength {
            left: cs1.old_len,
            right: cs2.old_len,
        });
    }
    cs1.validate()?;
    cs2.validate()?;

    let mut follower = Follower {
        chars1: CharCursor::new(&cs1.char_bank),
        chars2: CharCursor::new(&cs2.char_bank),
        insert_first: attribute_tester("insertorder", "first", pool),
        reverse_insert_order,
    };
    let old_len = cs1.new_len;
    let mut old_pos = 0;
    let mut new_len = 0;

    let ops = apply_zip(cs1.ops.iter().cloned(), cs2.ops.iter().cloned(), |op1, op2| {
        let out = follower.step(op1, op2, pool)?;
        if let Some(op) = &out {
            match op.opcode {
                OpCode::Keep => {
                    old_pos += op.chars;
                    new_len += op.chars;
                }
                OpCode::Remove => old_pos += op.chars,
                OpCode::Insert => new_len += op.chars,
            }
        }
        Ok(out)
    })?;

    let untouched = old_len
        .checked_sub(old_pos)
        .ok_or_else(|| malformed(format!("followed changeset covers {old_pos} of {old_len} chars")))?;
    Ok(Changeset {
        old_len,
        new_len: new_len + untouched,
        ops,
        char_bank: cs2.char_bank.clone(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

struct Follower<'a> {
    chars1: CharCursor<'a>,
    chars2: CharCursor<'a>,
    insert_first: AttributeTester,
    reverse_insert_order: bool,
}

fn is_insert(op: &Option<Op>) -> bool {
    matches!(op, Some(o) if o.opcode == OpCode::Insert)
}

/// Chars and lines of the shorter op, preferring `first` on a tie.
fn shorter(first: &Op, second: &Op) -> (usize, usize) {
    if first.chars <= second.chars {
        (first.chars, first.lines)
    } else {
        (second.chars, second.lines)
    }
}

impl Follower<'_> {
    fn step(&mut self, op1: &mut Option<Op>, op2: &mut Option<Op>, pool: &mut AttributePool) -> Result<Option<Op>> {
        if is_insert(op1) || is_insert(op2) {
            let side = if !is_insert(op2) {
                Side::First
            } else if !is_insert(op1) {
                Side::Second
            } else {
                self.insert_order(op1, op2)
            };
            return match side {
                Side::First => {
                    let Some(op) = op1.take() else { return Ok(None) };
                    self.chars1.skip(op.chars)?;
                    Ok(Some(Op::keep(op.chars, op.lines)))
                }
                Side::Second => {
                    let Some(op) = op2.take() else { return Ok(None) };
                    self.chars2.skip(op.chars)?;
                    Ok(Some(op))
                }
            };
        }

        let (Some(a), Some(b)) = (op1.as_ref(), op2.as_ref()) else {
            // One side is exhausted. Leftover removes and keeps of `cs1` have
            // no counterpart, and `cs2`'s ops pass through unchanged.
            if op1.take().is_none() {
                return Ok(op2.take());
            }
            return Ok(None);
        };

        match (a.opcode, b.opcode) {
            (OpCode::Remove, _) => {
                // Already removed by `cs1`.
                let (chars, lines) = shorter(a, b);
                consume(op1, chars, lines);
                consume(op2, chars, lines);
                Ok(None)
            }
            (_, OpCode::Remove) => {
                let (chars, lines) = shorter(b, a);
                let out = Op { chars, lines, ..b.clone() };
                consume(op1, chars, lines);
                consume(op2, chars, lines);
                Ok(Some(out))
            }
            _ => {
                let attribs = follow_attributes(&a.attribs, &b.attribs, pool)?;
                let (chars, lines) = shorter(a, b);
                consume(op1, chars, lines);
                consume(op2, chars, lines);
                Ok(Some(Op::new(OpCode::Keep, chars, lines, attribs)))
            }
        }
    }

    fn insert_order(&self, op1: &Option<Op>, op2: &Option<Op>) -> Side {
        let first1 = op1.as_ref().is_some_and(|op| self.insert_first.matches(&op.attribs));
        let first2 = op2.as_ref().is_some_and(|op| self.insert_first.matches(&op.attribs));
        if first1 && !first2 {
            return Side::First;
        }
        if first2 && !first1 {
            return Side::Second;
        }
        // Text that does not start with a newline goes first so lines are not
        // broken up.
        let newline1 = self.chars1.peek_char() == Some('\n');
        let newline2 = self.chars2.peek_char() == Some('\n');
        match (newline1, newline2) {
            (true, false) => Side::Second,
            (false, true) => Side::First,
            _ if self.reverse_insert_order => Side::Second,
            _ => Side::First,
        }
    }
}
