//! The unit of a changeset: keep, insert or remove a run of characters.

use std::fmt;

use crate::attribs::Attribs;
use crate::num::push_num;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// `=`: keep characters from the base text, optionally changing their
    /// attributes.
    Keep,
    /// `+`: insert characters taken from the char bank.
    Insert,
    /// `-`: remove characters from the base text.
    Remove,
}

impl OpCode {
    pub fn symbol(self) -> char {
        match self {
            OpCode::Keep => '=',
            OpCode::Insert => '+',
            OpCode::Remove => '-',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '=' => Some(OpCode::Keep),
            '+' => Some(OpCode::Insert),
            '-' => Some(OpCode::Remove),
            _ => None,
        }
    }
}

/// A single operation.
///
/// `lines` counts the newlines among the `chars` characters. When non-zero,
/// the last of those characters is a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub opcode: OpCode,
    pub chars: usize,
    pub lines: usize,
    pub attribs: Attribs,
}

impl Op {
    pub fn new(opcode: OpCode, chars: usize, lines: usize, attribs: Attribs) -> Self {
        Op { opcode, chars, lines, attribs }
    }

    pub fn keep(chars: usize, lines: usize) -> Self {
        Op::new(OpCode::Keep, chars, lines, Attribs::new())
    }

    pub fn insert(chars: usize, lines: usize) -> Self {
        Op::new(OpCode::Insert, chars, lines, Attribs::new())
    }

    pub fn remove(chars: usize, lines: usize) -> Self {
        Op::new(OpCode::Remove, chars, lines, Attribs::new())
    }

    pub fn with_attribs(mut self, attribs: Attribs) -> Self {
        self.attribs = attribs;
        self
    }

    /// Chars of the base text this op accounts for.
    pub fn consumed(&self) -> usize {
        match self.opcode {
            OpCode::Insert => 0,
            OpCode::Keep | OpCode::Remove => self.chars,
        }
    }

    /// Chars of the resulting text this op accounts for.
    pub fn produced(&self) -> usize {
        match self.opcode {
            OpCode::Remove => 0,
            OpCode::Keep | OpCode::Insert => self.chars,
        }
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        out.push_str(&self.attribs.to_string());
        if self.lines > 0 {
            out.push('|');
            push_num(out, self.lines);
        }
        out.push(self.opcode.symbol());
        push_num(out, self.chars);
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.write_to(&mut s);
        f.write_str(&s)
    }
}
