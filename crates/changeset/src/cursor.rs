//! Two-stream op walking shared by compose, follow and attribution updates.
//!
//! Op boundaries of two streams rarely line up, so both walks hold the
//! current op of each stream as an `Option<Op>` "remainder": a step function
//! consumes a prefix of one or both remainders (shrinking them, or setting
//! them to `None` once fully used) and may emit one output op.

use crate::assembler::SmartOpAssembler;
use crate::attribs::compose_attributes;
use crate::error::{malformed, Result};
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

/// Walks `ops1` and `ops2` in lockstep, feeding every emitted op through a
/// [`SmartOpAssembler`]. Ends when both streams are exhausted.
///
/// `step` receives the remainders of both streams (`None` once a stream is
/// exhausted) and must consume at least one of them.
pub(crate) fn apply_zip<I1, I2, F>(ops1: I1, ops2: I2, mut step: F) -> Result<Vec<Op>>
where
    I1: IntoIterator<Item = Op>,
    I2: IntoIterator<Item = Op>,
    F: FnMut(&mut Option<Op>, &mut Option<Op>) -> Result<Option<Op>>,
{
    let mut ops1 = ops1.into_iter().fuse();
    let mut ops2 = ops2.into_iter().fuse();
    let mut op1 = None;
    let mut op2 = None;
    let mut assem = SmartOpAssembler::new();
    loop {
        if op1.is_none() {
            op1 = ops1.next();
        }
        if op2.is_none() {
            op2 = ops2.next();
        }
        if op1.is_none() && op2.is_none() {
            break;
        }
        if let Some(out) = step(&mut op1, &mut op2)? {
            assem.append(out);
        }
    }
    assem.end_document();
    Ok(assem.into_ops())
}

/// Removes `chars` characters (`lines` of them newlines) from the front of a
/// remainder, clearing it once nothing is left.
pub(crate) fn consume(op: &mut Option<Op>, chars: usize, lines: usize) {
    if let Some(o) = op.as_mut() {
        o.chars = o.chars.saturating_sub(chars);
        o.lines = o.lines.saturating_sub(lines);
        if o.chars == 0 {
            *op = None;
        }
    }
}

/// Applies the op `cs` to the op `att`, where `att` comes from an attribution
/// string or from the earlier of two changesets being composed.
///
/// Removes in `att` and inserts in `cs` pass straight through. Otherwise the
/// shorter of the two ops is consumed entirely, the same prefix of the longer
/// one is consumed, and the result op is:
///
/// | att \ cs | `-`      | `=` |
/// |----------|----------|-----|
/// | `+`      | (none)   | `+` |
/// | `=`      | `-`      | `=` |
pub(crate) fn slicer_zipper(
    att: &mut Option<Op>,
    cs: &mut Option<Op>,
    pool: &mut AttributePool,
) -> Result<Option<Op>> {
    if att.is_none() {
        return Ok(cs.take());
    }
    if cs.is_none() {
        return Ok(att.take());
    }
    if matches!(att, Some(a) if a.opcode == OpCode::Remove) {
        return Ok(att.take());
    }
    if matches!(cs, Some(c) if c.opcode == OpCode::Insert) {
        return Ok(cs.take());
    }
    let (Some(a), Some(c)) = (att.as_mut(), cs.as_mut()) else {
        return Ok(None);
    };
    for op in [&*a, &*c] {
        if op.lines > op.chars {
            return Err(malformed(format!("op has more newlines than chars: {op}")));
        }
    }
    let lines_consistent = if a.chars < c.chars {
        a.lines <= c.lines
    } else if a.chars > c.chars {
        a.lines >= c.lines
    } else {
        a.lines == c.lines
    };
    if !lines_consistent {
        return Err(malformed(format!(
            "line count mismatch when composing changesets; opA: {a} opB: {c}"
        )));
    }
    let opcode = match (a.opcode, c.opcode) {
        (OpCode::Insert, OpCode::Remove) => None,
        (OpCode::Insert, OpCode::Keep) => Some(OpCode::Insert),
        (OpCode::Keep, OpCode::Remove) => Some(OpCode::Remove),
        (OpCode::Keep, OpCode::Keep) => Some(OpCode::Keep),
        _ => return Err(malformed(format!("unexpected op pair: {a} {c}"))),
    };
    // Removes normally carry no attributes, but any they do carry are kept.
    let attribs = if c.opcode == OpCode::Remove {
        c.attribs.clone()
    } else {
        compose_attributes(&a.attribs, &c.attribs, a.opcode == OpCode::Keep, pool)?
    };
    let att_fully_consumed = a.chars <= c.chars;
    let (chars, lines) = if att_fully_consumed {
        (a.chars, a.lines)
    } else {
        (c.chars, c.lines)
    };
    if att_fully_consumed {
        *att = None;
        consume(cs, chars, lines);
    } else {
        consume(att, chars, lines);
        *cs = None;
    }
    Ok(opcode.map(|opcode| Op { opcode, chars, lines, attribs }))
}

// ── CharCursor ────────────────────────────────────────────────────────────

/// Forward cursor over the characters of a string (a char bank or a text).
#[derive(Debug, Clone)]
pub(crate) struct CharCursor<'a> {
    rest: &'a str,
    remaining: usize,
}

/// Splits `s` after `n` chars, or `None` if it is shorter than that.
pub(crate) fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    let mut indices = s.char_indices();
    for _ in 0..n {
        indices.next()?;
    }
    let at = indices.next().map_or(s.len(), |(i, _)| i);
    Some(s.split_at(at))
}

impl<'a> CharCursor<'a> {
    pub(crate) fn new(s: &'a str) -> Self {
        CharCursor { rest: s, remaining: s.chars().count() }
    }

    pub(crate) fn peek(&self, n: usize) -> Result<&'a str> {
        if n > self.remaining {
            return Err(malformed(format!("need {n} chars, {} remaining", self.remaining)));
        }
        split_chars(self.rest, n)
            .map(|(head, _)| head)
            .ok_or_else(|| malformed("char cursor out of sync"))
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a str> {
        let head = self.peek(n)?;
        self.rest = &self.rest[head.len()..];
        self.remaining -= n;
        Ok(head)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn take_rest(&mut self) -> &'a str {
        let rest = self.rest;
        self.rest = "";
        self.remaining = 0;
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{parse_ops, serialize_ops};

    #[test]
    fn char_cursor_counts_scalar_values() {
        let mut cursor = CharCursor::new("héllo\n");
        assert_eq!(cursor.take(2).unwrap(), "hé");
        assert_eq!(cursor.peek_char(), Some('l'));
        cursor.skip(3).unwrap();
        assert!(cursor.take(2).is_err());
        assert_eq!(cursor.take_rest(), "\n");
    }

    #[test]
    fn consume_clears_exhausted_ops() {
        let mut op = Some(Op::keep(3, 1));
        consume(&mut op, 2, 0);
        assert_eq!(op, Some(Op::keep(1, 1)));
        consume(&mut op, 1, 1);
        assert_eq!(op, None);
    }

    #[test]
    fn slicer_zip_applies_keeps_to_inserts() {
        let mut pool: AttributePool = [("bold", "true")].into_iter().collect();
        let att = parse_ops("+5").unwrap();
        let cs = parse_ops("=2*0=2-1").unwrap();
        let out = apply_zip(att, cs, |a, c| slicer_zipper(a, c, &mut pool)).unwrap();
        assert_eq!(serialize_ops(&out), "+2*0+2");
    }

    #[test]
    fn slicer_rejects_inconsistent_lines() {
        let mut pool = AttributePool::new();
        let mut a = Some(Op::keep(3, 0));
        let mut c = Some(Op::keep(3, 1));
        assert!(slicer_zipper(&mut a, &mut c, &mut pool).is_err());
    }
}
