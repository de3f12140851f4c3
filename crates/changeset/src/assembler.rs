//! Op assemblers: incremental op stream construction.
//!
//! - [`OpAssembler`] serializes ops as given.
//! - [`MergingOpAssembler`] merges neighbours, drops no-ops and (on
//!   [`end_document`](MergingOpAssembler::end_document)) the final pure keep.
//!   It never reorders.
//! - [`SmartOpAssembler`] additionally emits every run of removes and inserts
//!   as removes-then-inserts, which is the canonical changeset form.

use std::fmt;

use crate::codec::serialize_ops;
use crate::op::{Op, OpCode};

// ── OpAssembler ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OpAssembler {
    serialized: String,
}

impl OpAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: &Op) {
        op.write_to(&mut self.serialized);
    }

    pub fn clear(&mut self) {
        self.serialized.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.serialized
    }
}

impl fmt::Display for OpAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}

// ── MergingOpAssembler ────────────────────────────────────────────────────

/// Merges consecutive mergeable ops.
///
/// Ops with the same opcode and attributes merge, with one exception driven
/// by the newline rule: `[xxx\n, yyy]` stays two ops (a multi-line op must
/// end in a newline), but `[xxx\n, yyy, zzz\n]` merges into one
/// `xxx\nyyyzzz\n` op. The length of `yyy` is held back in
/// `additional_chars_after_newline` until it is known which case applies.
#[derive(Debug, Clone, Default)]
pub struct MergingOpAssembler {
    ops: Vec<Op>,
    buf: Option<Op>,
    additional_chars_after_newline: usize,
}

impl MergingOpAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: Op) {
        if op.chars == 0 {
            return;
        }
        if let Some(buf) = self.buf.as_mut() {
            if buf.opcode == op.opcode && buf.attribs == op.attribs {
                if op.lines > 0 {
                    buf.chars += self.additional_chars_after_newline + op.chars;
                    buf.lines += op.lines;
                    self.additional_chars_after_newline = 0;
                } else if buf.lines == 0 {
                    buf.chars += op.chars;
                } else {
                    self.additional_chars_after_newline += op.chars;
                }
                return;
            }
        }
        self.flush(false);
        self.buf = Some(op);
    }

    fn flush(&mut self, is_end_document: bool) {
        let Some(buf) = self.buf.take() else {
            return;
        };
        let tail = std::mem::take(&mut self.additional_chars_after_newline);
        if is_end_document && buf.opcode == OpCode::Keep && buf.attribs.is_empty() {
            // Final pure keep stays implicit.
            return;
        }
        let tail_op = (tail > 0).then(|| Op {
            chars: tail,
            lines: 0,
            ..buf.clone()
        });
        self.ops.push(buf);
        self.ops.extend(tail_op);
    }

    /// Flushes the buffer, dropping it if it is a pure keep.
    pub fn end_document(&mut self) {
        self.flush(true);
    }

    pub fn clear(&mut self) {
        self.ops.clear();
        self.buf = None;
        self.additional_chars_after_newline = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.buf.is_none()
    }

    /// Flushes and drains the assembled ops.
    pub fn take_ops(&mut self) -> Vec<Op> {
        self.flush(false);
        std::mem::take(&mut self.ops)
    }

    /// The ops assembled so far, including the pending buffer.
    pub fn to_ops(&self) -> Vec<Op> {
        let mut ops = self.ops.clone();
        if let Some(buf) = &self.buf {
            ops.push(buf.clone());
            if self.additional_chars_after_newline > 0 {
                ops.push(Op {
                    chars: self.additional_chars_after_newline,
                    lines: 0,
                    ..buf.clone()
                });
            }
        }
        ops
    }
}

impl fmt::Display for MergingOpAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_ops(&self.to_ops()))
    }
}

// ── SmartOpAssembler ──────────────────────────────────────────────────────

/// Produces canonical op streams from slightly looser input: merges like
/// [`MergingOpAssembler`] and reorders each run of inserts and removes so the
/// removes come first.
#[derive(Debug, Clone, Default)]
pub struct SmartOpAssembler {
    minus: MergingOpAssembler,
    plus: MergingOpAssembler,
    keep: MergingOpAssembler,
    ops: Vec<Op>,
    last_opcode: Option<OpCode>,
    length_change: isize,
}

impl SmartOpAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: Op) {
        if op.chars == 0 {
            return;
        }
        let opcode = op.opcode;
        match opcode {
            OpCode::Remove => {
                if self.last_opcode == Some(OpCode::Keep) {
                    self.flush_keeps();
                }
                self.length_change -= op.chars as isize;
                self.minus.append(op);
            }
            OpCode::Insert => {
                if self.last_opcode == Some(OpCode::Keep) {
                    self.flush_keeps();
                }
                self.length_change += op.chars as isize;
                self.plus.append(op);
            }
            OpCode::Keep => {
                if self.last_opcode != Some(OpCode::Keep) {
                    self.flush_plus_minus();
                }
                self.keep.append(op);
            }
        }
        self.last_opcode = Some(opcode);
    }

    fn flush_keeps(&mut self) {
        self.ops.extend(self.keep.take_ops());
    }

    fn flush_plus_minus(&mut self) {
        self.ops.extend(self.minus.take_ops());
        self.ops.extend(self.plus.take_ops());
    }

    /// Drops a trailing pure keep.
    pub fn end_document(&mut self) {
        self.keep.end_document();
    }

    /// Net change in text length of everything appended since the last clear.
    pub fn length_change(&self) -> isize {
        self.length_change
    }

    pub fn clear(&mut self) {
        self.minus.clear();
        self.plus.clear();
        self.keep.clear();
        self.ops.clear();
        self.last_opcode = None;
        self.length_change = 0;
    }

    pub fn take_ops(&mut self) -> Vec<Op> {
        self.flush_plus_minus();
        self.flush_keeps();
        self.last_opcode = None;
        std::mem::take(&mut self.ops)
    }

    pub fn into_ops(mut self) -> Vec<Op> {
        self.take_ops()
    }

    pub fn to_ops(&self) -> Vec<Op> {
        let mut ops = self.ops.clone();
        ops.extend(self.minus.to_ops());
        ops.extend(self.plus.to_ops());
        ops.extend(self.keep.to_ops());
        ops
    }
}

impl fmt::Display for SmartOpAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_ops(&self.to_ops()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_ops;

    fn merge(input: &str) -> String {
        let mut assem = MergingOpAssembler::new();
        for op in parse_ops(input).unwrap() {
            assem.append(op);
        }
        assem.to_string()
    }

    #[test]
    fn op_assembler_is_verbatim() {
        let mut assem = OpAssembler::new();
        for op in parse_ops("=1=1+0").unwrap() {
            assem.append(&op);
        }
        assert_eq!(assem.as_str(), "=1=1+0");
    }

    #[test]
    fn merging_keeps_text_after_newline_separate() {
        assert_eq!(merge("|1+2+3"), "|1+2+3");
        assert_eq!(merge("|1+2+3|1+4"), "|2+9");
        assert_eq!(merge("+1+2"), "+3");
        assert_eq!(merge("+1=0-2"), "+1-2");
    }

    #[test]
    fn merging_end_document_drops_pure_keep() {
        let mut assem = MergingOpAssembler::new();
        for op in parse_ops("+1=2|1=3").unwrap() {
            assem.append(op);
        }
        assem.end_document();
        assert_eq!(assem.to_string(), "+1");

        let mut assem = MergingOpAssembler::new();
        for op in parse_ops("+1*0=2").unwrap() {
            assem.append(op);
        }
        assem.end_document();
        assert_eq!(assem.to_string(), "+1*0=2");
    }

    #[test]
    fn smart_orders_removes_before_inserts() {
        let mut assem = SmartOpAssembler::new();
        for op in parse_ops("+1-1=1+2-2+1").unwrap() {
            assem.append(op);
        }
        assert_eq!(assem.to_string(), "-1+1=1-2+3");
        assert_eq!(assem.length_change(), 1);
    }

    #[test]
    fn smart_clear_resets_length_change() {
        let mut assem = SmartOpAssembler::new();
        assem.append(Op::insert(4, 0));
        assem.clear();
        assert_eq!(assem.length_change(), 0);
        assert_eq!(assem.to_string(), "");
    }
}
