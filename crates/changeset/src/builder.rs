//! Incremental changeset construction.

use crate::assembler::SmartOpAssembler;
use crate::attribs::{make_attribs, Attribs};
use crate::codec::Changeset;
use crate::error::{malformed, ChangesetError, Result};
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

/// Generates the ops covering `text`: one op when `text` has no newline,
/// otherwise one op through the last newline and one for the remainder.
pub fn ops_from_text(opcode: OpCode, text: &str, attribs: Attribs) -> impl Iterator<Item = Op> {
    let total = text.chars().count();
    let (first, tail) = match text.rfind('\n') {
        None => (Op::new(opcode, total, 0, attribs), None),
        Some(i) => {
            let head = text[..=i].chars().count();
            let lines = text.matches('\n').count();
            let first = Op::new(opcode, head, lines, attribs.clone());
            (first, Some(Op::new(opcode, total - head, 0, attribs)))
        }
    };
    std::iter::once(first).chain(tail)
}

/// Builds a changeset over a text of `old_len` characters.
///
/// ```
/// use pad_changeset::{Attribs, Builder};
///
/// let mut builder = Builder::new(6);
/// builder.keep(5, 0, Attribs::new()).insert("!", Attribs::new()).keep(1, 1, Attribs::new());
/// assert_eq!(builder.build().unwrap().to_string(), "Z:6>1=5+1$!");
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    old_len: usize,
    consumed: usize,
    produced: usize,
    assem: SmartOpAssembler,
    char_bank: String,
    // First op pushed with more newlines than chars; merging would hide it.
    bad_op: Option<Op>,
}

impl Builder {
    pub fn new(old_len: usize) -> Self {
        Builder {
            old_len,
            consumed: 0,
            produced: 0,
            assem: SmartOpAssembler::new(),
            char_bank: String::new(),
            bad_op: None,
        }
    }

    fn push(&mut self, op: Op) {
        if op.lines > op.chars && self.bad_op.is_none() {
            self.bad_op = Some(op.clone());
        }
        self.consumed += op.consumed();
        self.produced += op.produced();
        self.assem.append(op);
    }

    /// Keeps `chars` characters, `lines` of which are newlines, applying the
    /// attribute change `attribs`.
    pub fn keep(&mut self, chars: usize, lines: usize, attribs: Attribs) -> &mut Self {
        self.push(Op::new(OpCode::Keep, chars, lines, attribs));
        self
    }

    /// [`keep`](Builder::keep) with attributes given as pairs. An empty value
    /// clears the key.
    pub fn keep_with<K, V>(
        &mut self,
        chars: usize,
        lines: usize,
        pairs: impl IntoIterator<Item = (K, V)>,
        pool: &mut AttributePool,
    ) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attribs = make_attribs(OpCode::Keep, pairs, pool);
        self.keep(chars, lines, attribs)
    }

    /// Keeps the characters of `text`, computing the newline count from it.
    pub fn keep_text(&mut self, text: &str, attribs: Attribs) -> &mut Self {
        for op in ops_from_text(OpCode::Keep, text, attribs) {
            self.push(op);
        }
        self
    }

    pub fn insert(&mut self, text: &str, attribs: Attribs) -> &mut Self {
        for op in ops_from_text(OpCode::Insert, text, attribs) {
            self.push(op);
        }
        self.char_bank.push_str(text);
        self
    }

    /// [`insert`](Builder::insert) with attributes given as pairs. Pairs with
    /// an empty value are dropped.
    pub fn insert_with<K, V>(
        &mut self,
        text: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
        pool: &mut AttributePool,
    ) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attribs = make_attribs(OpCode::Insert, pairs, pool);
        self.insert(text, attribs)
    }

    pub fn remove(&mut self, chars: usize, lines: usize) -> &mut Self {
        self.push(Op::remove(chars, lines));
        self
    }

    /// Removes the characters of `text`, computing the newline count from it.
    pub fn remove_text(&mut self, text: &str) -> &mut Self {
        for op in ops_from_text(OpCode::Remove, text, Attribs::new()) {
            self.push(op);
        }
        self
    }

    /// Finalizes the changeset. Kept plus removed characters must add up to
    /// exactly `old_len`, and every op must have no more newlines than
    /// characters.
    pub fn build(mut self) -> Result<Changeset> {
        if let Some(op) = self.bad_op {
            return Err(malformed(format!("op has more newlines than chars: {op}")));
        }
        if self.consumed != self.old_len {
            return Err(ChangesetError::IncompleteChangeset {
                expected: self.old_len,
                actual: self.consumed,
            });
        }
        self.assem.end_document();
        let cs = Changeset {
            old_len: self.old_len,
            new_len: self.produced,
            ops: self.assem.into_ops(),
            char_bank: self.char_bank,
        };
        cs.validate()?;
        Ok(cs)
    }
}
