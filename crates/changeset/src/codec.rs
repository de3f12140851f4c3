//! Changeset wire format.
//!
//! ```text
//! Z:<oldLen>(>|<)<|newLen - oldLen|><op>*$<charBank>
//! op := (*<attrib>)* (|<lines>)? (=|+|-) <chars>
//! ```
//!
//! All numbers are lowercase radix 36. A pure keep at the end of the op
//! stream is implicit and never written, so the identity changeset over `n`
//! characters is `Z:<n>>0$`.

use std::fmt;
use std::str::FromStr;

use crate::assembler::SmartOpAssembler;
use crate::attribs::{parse_attrib_num, Attribs};
use crate::error::{malformed, ChangesetError, Result};
use crate::num::{digit_value, num_to_string, parse_num};
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

// ── Op token scanner ──────────────────────────────────────────────────────

/// Iterator over the ops of a serialized op stream. Stops at the `$` that
/// introduces the char bank; yields one error and then stops on an invalid
/// token.
pub struct OpIter<'a> {
    src: &'a str,
    pos: usize,
    done: bool,
}

/// Parses a string of serialized ops (an op stream, an attribution string, or
/// the op section of a changeset).
pub fn deserialize_ops(ops: &str) -> OpIter<'_> {
    OpIter { src: ops, pos: 0, done: false }
}

/// Collects [`deserialize_ops`] into a vector.
pub fn parse_ops(ops: &str) -> Result<Vec<Op>> {
    deserialize_ops(ops).collect()
}

impl<'a> OpIter<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().and_then(digit_value).is_some() {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn invalid(&self, start: usize) -> ChangesetError {
        malformed(format!("invalid operation: {}", &self.src[start..]))
    }

    fn scan_op(&mut self) -> Result<Op> {
        let start = self.pos;
        let mut attribs = Attribs::new();
        while self.peek() == Some(b'*') {
            self.pos += 1;
            let digits = self.digits();
            if digits.is_empty() {
                return Err(self.invalid(start));
            }
            attribs.push(parse_attrib_num(digits)?);
        }
        let mut lines = 0;
        if self.peek() == Some(b'|') {
            self.pos += 1;
            let digits = self.digits();
            if digits.is_empty() {
                return Err(self.invalid(start));
            }
            lines = parse_num(digits)?;
        }
        let opcode = self
            .peek()
            .and_then(|b| OpCode::from_symbol(b as char))
            .ok_or_else(|| self.invalid(start))?;
        self.pos += 1;
        let digits = self.digits();
        if digits.is_empty() {
            return Err(self.invalid(start));
        }
        let chars = parse_num(digits)?;
        Ok(Op { opcode, chars, lines, attribs })
    }
}

impl Iterator for OpIter<'_> {
    type Item = Result<Op>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.peek() {
            None | Some(b'$') => {
                self.done = true;
                None
            }
            Some(_) => {
                let op = self.scan_op();
                if op.is_err() {
                    self.done = true;
                }
                Some(op)
            }
        }
    }
}

/// Serializes ops verbatim, without merging.
pub fn serialize_ops<'a>(ops: impl IntoIterator<Item = &'a Op>) -> String {
    let mut out = String::new();
    for op in ops {
        op.write_to(&mut out);
    }
    out
}

// ── Header ────────────────────────────────────────────────────────────────

/// The raw sections of a serialized changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpacked<'a> {
    pub old_len: usize,
    pub new_len: usize,
    pub ops: &'a str,
    pub char_bank: &'a str,
}

/// Splits a serialized changeset into header lengths, op stream and char bank.
pub fn unpack(cs: &str) -> Result<Unpacked<'_>> {
    let not_a_changeset = || malformed(format!("not a changeset: {cs:?}"));
    let rest = cs.strip_prefix("Z:").ok_or_else(not_a_changeset)?;
    let sign_at = rest
        .find(|c: char| c == '>' || c == '<')
        .ok_or_else(not_a_changeset)?;
    let old_len = parse_num(&rest[..sign_at])?;
    let growing = rest.as_bytes()[sign_at] == b'>';
    let after_sign = &rest[sign_at + 1..];
    let mag_end = after_sign
        .bytes()
        .position(|b| digit_value(b).is_none())
        .unwrap_or(after_sign.len());
    let magnitude = parse_num(&after_sign[..mag_end])?;
    let new_len = if growing {
        old_len.checked_add(magnitude)
    } else {
        old_len.checked_sub(magnitude)
    }
    .ok_or_else(|| malformed(format!("length change out of range: {cs:?}")))?;
    let body = &after_sign[mag_end..];
    let (ops, char_bank) = match body.find('$') {
        Some(i) => (&body[..i], &body[i + 1..]),
        None => (body, ""),
    };
    Ok(Unpacked { old_len, new_len, ops, char_bank })
}

/// Writes a changeset from its sections.
pub fn pack(old_len: usize, new_len: usize, ops: &str, char_bank: &str) -> String {
    let (sign, magnitude) = if new_len >= old_len {
        ('>', new_len - old_len)
    } else {
        ('<', old_len - new_len)
    };
    format!(
        "Z:{}{}{}{}${}",
        num_to_string(old_len),
        sign,
        num_to_string(magnitude),
        ops,
        char_bank
    )
}

// ── Changeset ─────────────────────────────────────────────────────────────

/// A parsed changeset.
///
/// Lengths count Unicode scalar values. `ops` excludes the implicit trailing
/// keep, so the ops may account for fewer than `old_len` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    pub old_len: usize,
    pub new_len: usize,
    pub ops: Vec<Op>,
    pub char_bank: String,
}

impl Changeset {
    /// The no-op changeset over `len` characters.
    pub fn identity(len: usize) -> Self {
        Changeset {
            old_len: len,
            new_len: len,
            ops: Vec::new(),
            char_bank: String::new(),
        }
    }

    /// Parses and structurally validates a serialized changeset.
    pub fn parse(cs: &str) -> Result<Self> {
        let unpacked = unpack(cs)?;
        let changeset = Changeset {
            old_len: unpacked.old_len,
            new_len: unpacked.new_len,
            ops: parse_ops(unpacked.ops)?,
            char_bank: unpacked.char_bank.to_string(),
        };
        changeset.validate()?;
        Ok(changeset)
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty() && self.old_len == self.new_len
    }

    /// Checks position-completeness and that the char bank backs the insert
    /// ops exactly.
    pub fn validate(&self) -> Result<()> {
        let mut old_pos = 0usize;
        let mut produced = 0usize;
        let mut bank = self.char_bank.chars();
        for op in &self.ops {
            if op.lines > op.chars {
                return Err(malformed(format!("op has more newlines than chars: {op}")));
            }
            match op.opcode {
                OpCode::Keep => {
                    old_pos += op.chars;
                    produced += op.chars;
                }
                OpCode::Remove => old_pos += op.chars,
                OpCode::Insert => {
                    let mut newlines = 0;
                    let mut last = None;
                    for _ in 0..op.chars {
                        let c = bank
                            .next()
                            .ok_or_else(|| malformed("not enough chars in char bank"))?;
                        if c == '\n' {
                            newlines += 1;
                        }
                        last = Some(c);
                    }
                    if newlines != op.lines {
                        return Err(malformed(
                            "number of newlines in insert op does not match the char bank",
                        ));
                    }
                    if op.lines > 0 && last != Some('\n') {
                        return Err(malformed("multiline insert op does not end with a newline"));
                    }
                    produced += op.chars;
                }
            }
            if old_pos > self.old_len {
                return Err(malformed(format!(
                    "ops consume {old_pos} chars of a {}-char text",
                    self.old_len
                )));
            }
        }
        if bank.next().is_some() {
            return Err(malformed("excess characters in the char bank"));
        }
        let computed = produced + (self.old_len - old_pos);
        if computed != self.new_len {
            return Err(malformed(format!(
                "claimed length {} does not match actual length {computed}",
                self.new_len
            )));
        }
        Ok(())
    }

    /// Fails with [`ChangesetError::PoolResolution`] if an op references an
    /// attribute that `pool` does not hold.
    pub fn check_pool(&self, pool: &AttributePool) -> Result<()> {
        for op in &self.ops {
            for n in op.attribs.iter() {
                if pool.get_attrib(n).is_err() {
                    return Err(ChangesetError::PoolResolution(n));
                }
            }
        }
        Ok(())
    }

    /// Re-assembles the ops through a [`SmartOpAssembler`]; the result is the
    /// canonical form of this changeset.
    pub fn normalized(&self) -> Changeset {
        let mut assem = SmartOpAssembler::new();
        for op in &self.ops {
            assem.append(op.clone());
        }
        assem.end_document();
        Changeset {
            old_len: self.old_len,
            new_len: self.new_len,
            ops: assem.into_ops(),
            char_bank: self.char_bank.clone(),
        }
    }
}

/// Validates a serialized changeset, including canonical form: the string
/// must be exactly what re-assembling its ops would produce.
pub fn check_rep(cs: &str) -> Result<Changeset> {
    let changeset = Changeset::parse(cs)?;
    let normalized = changeset.normalized();
    if normalized.to_string() != cs {
        return Err(malformed(format!("not in canonical form: {cs}")));
    }
    Ok(changeset)
}

impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pack(
            self.old_len,
            self.new_len,
            &serialize_ops(&self.ops),
            &self.char_bank,
        ))
    }
}

impl FromStr for Changeset {
    type Err = ChangesetError;

    fn from_str(s: &str) -> Result<Self> {
        Changeset::parse(s)
    }
}
