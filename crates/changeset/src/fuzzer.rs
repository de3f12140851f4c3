use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::assembler::SmartOpAssembler;
use crate::attribs::Attribs;
use crate::codec::Changeset;
use crate::cursor::split_chars;
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

/// Random documents and changesets for tests.
///
/// Uses the xoshiro256** PRNG so that a seeded fuzzer always produces the
/// same sequence.
///
/// # Examples
///
/// ```
/// use pad_changeset::fuzzer::Fuzzer;
/// use pad_changeset::apply::apply_to_text;
///
/// let mut fuzzer = Fuzzer::from_u64(7);
/// let text = format!("{}\n", fuzzer.random_multiline(5, 20));
/// let (cs, expected) = fuzzer.random_changeset(&text, false);
/// assert_eq!(apply_to_text(&cs, &text).unwrap(), expected);
/// ```
pub struct Fuzzer {
    /// The seed used to initialize the PRNG.
    pub seed: [u8; 32],
    rng: Xoshiro256StarStar,
}

enum StringOp {
    Insert(String),
    Remove(usize),
    Skip(usize),
}

impl Fuzzer {
    /// Creates a fuzzer with an optional seed. Without one, a seed is drawn
    /// from `OsRng`.
    pub fn new(seed: Option<[u8; 32]>) -> Self {
        let seed = seed.unwrap_or_else(|| {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            bytes
        });
        Self { seed, rng: Xoshiro256StarStar::from_seed(seed) }
    }

    /// Creates a fuzzer whose 32-byte seed is expanded from `seed`.
    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        for (i, chunk) in bytes.chunks_mut(8).enumerate() {
            chunk.copy_from_slice(&seed.wrapping_add(i as u64).to_le_bytes());
        }
        Self::new(Some(bytes))
    }

    /// A random integer in `0..n`; `0` when `n` is zero.
    pub fn random_int(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// A random f64 in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn random_bool(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }

    /// Picks a random element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, elements: &'a [T]) -> &'a T {
        let idx = self.random_int(elements.len());
        &elements[idx]
    }

    /// A string of `len` chars drawn from `chars`.
    pub fn random_string(&mut self, len: usize, chars: &str) -> String {
        let chars: Vec<char> = chars.chars().collect();
        (0..len).map(|_| *self.pick(&chars)).collect()
    }

    /// `len` random lowercase letters.
    pub fn random_inline_string(&mut self, len: usize) -> String {
        self.random_string(len, "abcdefghijklmnopqrstuvwxyz")
    }

    /// Random lines of lowercase letters, roughly bounded by the given line
    /// and column counts. May start with a newline; need not end with one.
    pub fn random_multiline(&mut self, approx_max_lines: usize, approx_max_cols: usize) -> String {
        let num_parts = self.random_int(approx_max_lines * 2) + 1;
        let mut text = String::new();
        if self.random_int(2) == 1 {
            text.push('\n');
        }
        for i in 0..num_parts {
            if i % 2 == 0 && self.random_int(10) != 0 {
                let len = self.random_int(approx_max_cols) + 1;
                text.push_str(&self.random_inline_string(len));
            } else {
                text.push('\n');
            }
        }
        text
    }

    fn random_string_op(&mut self, chars_left: usize) -> StringOp {
        let op = match self.random_int(11) {
            0 => StringOp::Insert(self.random_inline_string(1)),
            1 => StringOp::Remove(1),
            2 => StringOp::Skip(1),
            3 => {
                let len = self.random_int(4) + 1;
                StringOp::Insert(self.random_inline_string(len))
            }
            4 => StringOp::Remove(self.random_int(4) + 1),
            5 => StringOp::Skip(self.random_int(4) + 1),
            6 => StringOp::Insert(self.random_multiline(5, 20)),
            7 => StringOp::Remove(self.random_fraction(chars_left)),
            8 => StringOp::Skip(self.random_fraction(chars_left)),
            9 => StringOp::Remove(chars_left),
            _ => StringOp::Skip(chars_left),
        };
        // The final newline always survives.
        let max = chars_left.saturating_sub(1);
        match op {
            StringOp::Remove(n) => StringOp::Remove(n.min(max)),
            StringOp::Skip(n) => StringOp::Skip(n.min(max)),
            insert => insert,
        }
    }

    fn random_fraction(&mut self, n: usize) -> usize {
        let r = self.random() * self.random();
        (n as f64 * r).round() as usize
    }

    /// Attributes over the pool from [`two_prop_pool`], biased towards none.
    fn random_two_prop_attribs(&mut self, opcode: OpCode) -> Attribs {
        if opcode == OpCode::Remove || self.random_int(3) != 0 {
            return Attribs::new();
        }
        if self.random_int(3) != 0 {
            let base = if opcode == OpCode::Insert || self.random_int(2) == 1 { 1 } else { 0 };
            return Attribs::from(vec![self.random_int(2) as u32 * 2 + base]);
        }
        if opcode == OpCode::Insert || self.random_int(4) == 0 {
            return Attribs::from(vec![1, 3]);
        }
        let choices: [[u32; 2]; 3] = [[0, 2], [0, 3], [1, 2]];
        Attribs::from(self.pick(&choices).to_vec())
    }

    /// A random canonical changeset over `orig` (which must end in a
    /// newline), and the text it produces.
    ///
    /// With `with_attribs`, ops carry attributes from [`two_prop_pool`].
    pub fn random_changeset(&mut self, orig: &str, with_attribs: bool) -> (Changeset, String) {
        let old_len = orig.chars().count();
        let mut left = orig;
        let mut char_bank = String::new();
        let mut out_text = String::new();
        let mut assem = SmartOpAssembler::new();

        let mut append_ops = |fuzzer: &mut Fuzzer, opcode: OpCode, text: &str| {
            let attribs = if with_attribs {
                fuzzer.random_two_prop_attribs(opcode)
            } else {
                Attribs::new()
            };
            for line in text.split_inclusive('\n') {
                let (body, newline) = match line.strip_suffix('\n') {
                    Some(body) => (body, true),
                    None => (line, false),
                };
                let chars = body.chars().count();
                assem.append(Op::new(opcode, chars, 0, attribs.clone()));
                if newline {
                    assem.append(Op::new(opcode, 1, 1, attribs.clone()));
                }
            }
        };

        let mut step = |fuzzer: &mut Fuzzer, left: &mut &str| {
            let current: &str = *left;
            let chars_left = current.chars().count();
            match fuzzer.random_string_op(chars_left) {
                StringOp::Insert(text) => {
                    char_bank.push_str(&text);
                    out_text.push_str(&text);
                    append_ops(fuzzer, OpCode::Insert, &text);
                }
                StringOp::Skip(n) => {
                    let (head, tail) = split_chars(current, n).unwrap_or((current, ""));
                    out_text.push_str(head);
                    append_ops(fuzzer, OpCode::Keep, head);
                    *left = tail;
                }
                StringOp::Remove(n) => {
                    let (head, tail) = split_chars(current, n).unwrap_or((current, ""));
                    append_ops(fuzzer, OpCode::Remove, head);
                    *left = tail;
                }
            }
        };

        while left.chars().nth(1).is_some() {
            step(self, &mut left);
        }
        // Only inserts can happen from here on.
        for _ in 0..5 {
            step(self, &mut left);
        }

        out_text.push('\n');
        assem.end_document();
        let cs = Changeset {
            old_len,
            new_len: out_text.chars().count(),
            ops: assem.into_ops(),
            char_bank,
        };
        (cs, out_text)
    }
}

/// The pool random attributes are drawn from:
/// `[apple,""] [apple,true] [banana,""] [banana,true]`.
pub fn two_prop_pool() -> AttributePool {
    [("apple", ""), ("apple", "true"), ("banana", ""), ("banana", "true")]
        .into_iter()
        .collect()
}
