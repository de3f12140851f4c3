//! Attributed text: a document snapshot.
//!
//! `attribs` is an attribution string: a sequence of insert ops covering
//! `text` exactly, whose attributes are the presence attributes of the
//! characters they cover. A document's text always ends with a newline.

use serde::{Deserialize, Serialize};

use crate::assembler::{MergingOpAssembler, SmartOpAssembler};
use crate::attribs::Attribs;
use crate::builder::ops_from_text;
use crate::codec::{deserialize_ops, parse_ops, OpIter};
use crate::cursor::{slicer_zipper, split_chars};
use crate::error::{malformed, Result};
use crate::op::{Op, OpCode};
use crate::pool::AttributePool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AText {
    pub text: String,
    pub attribs: String,
}

impl AText {
    /// Validates that `attribs` is a sequence of insert ops covering `text`
    /// with correct newline counts.
    pub fn validate(&self) -> Result<()> {
        let mut rest = self.text.as_str();
        for op in deserialize_ops(&self.attribs) {
            let op = op?;
            if op.opcode != OpCode::Insert {
                return Err(malformed(format!("attribution contains non-insert op {op}")));
            }
            let (run, tail) = split_chars(rest, op.chars)
                .ok_or_else(|| malformed("attribution is longer than the text"))?;
            if run.matches('\n').count() != op.lines {
                return Err(malformed(format!("attribution op {op} disagrees with the text")));
            }
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(malformed("attribution is shorter than the text"));
        }
        Ok(())
    }

    /// Number of characters in the text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Creates an [`AText`], generating a plain attribution when none is given.
pub fn make_atext(text: &str, attribs: Option<&str>) -> AText {
    AText {
        text: text.to_string(),
        attribs: attribs.map_or_else(|| make_attribution(text), str::to_string),
    }
}

/// The attribution string of `text` without any attributes.
pub fn make_attribution(text: &str) -> String {
    let mut assem = SmartOpAssembler::new();
    for op in ops_from_text(OpCode::Insert, text, Attribs::new()) {
        assem.append(op);
    }
    assem.to_string()
}

/// The insert ops that recreate `atext`, excluding its final newline.
pub fn ops_from_atext(atext: &AText) -> Result<Vec<Op>> {
    let mut ops = parse_ops(&atext.attribs)?;
    let Some(mut last) = ops.pop() else {
        return Ok(ops);
    };
    if last.lines <= 1 {
        last.lines = 0;
        last.chars = last.chars.saturating_sub(1);
    } else {
        let mut chars = atext.text.chars();
        chars.next_back();
        let body = chars.as_str();
        let last_line = body.rfind('\n').map_or(body, |i| &body[i + 1..]);
        let last_line_len = last_line.chars().count();
        last.lines -= 1;
        last.chars = last
            .chars
            .checked_sub(last_line_len + 1)
            .ok_or_else(|| malformed("attribution disagrees with the text"))?;
        ops.push(last.clone());
        last.lines = 0;
        last.chars = last_line_len;
    }
    if last.chars > 0 {
        ops.push(last);
    }
    Ok(ops)
}

/// Splits text into lines, each keeping its newline. A final line without a
/// newline is kept if non-empty.
pub fn split_text_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Splits an attribution string into one attribution string per line of
/// `text`.
pub fn split_attribution_lines(attribution: &str, text: &str) -> Result<Vec<String>> {
    let newline_ends: Vec<usize> = text
        .chars()
        .enumerate()
        .filter(|(_, c)| *c == '\n')
        .map(|(i, _)| i + 1)
        .collect();
    let mut assem = MergingOpAssembler::new();
    let mut lines = Vec::new();
    let mut pos = 0;

    let mut push = |op: Op, pos: &mut usize| {
        *pos += op.chars;
        let ends_line = op.lines > 0;
        assem.append(op);
        if ends_line {
            lines.push(assem.to_string());
            assem.clear();
        }
    };

    for op in deserialize_ops(attribution) {
        let mut op = op?;
        let mut num_chars = op.chars;
        let mut num_lines = op.lines;
        while num_lines > 1 {
            let idx = newline_ends.partition_point(|&end| end <= pos);
            let newline_end = *newline_ends
                .get(idx)
                .ok_or_else(|| malformed("attribution has more lines than the text"))?;
            let piece = Op { chars: newline_end - pos, lines: 1, ..op.clone() };
            num_chars = num_chars
                .checked_sub(piece.chars)
                .ok_or_else(|| malformed("attribution disagrees with the text"))?;
            num_lines -= 1;
            push(piece, &mut pos);
        }
        if num_lines == 1 {
            op.chars = num_chars;
            op.lines = 1;
        }
        push(op, &mut pos);
    }
    Ok(lines)
}

/// Joins per-line attribution strings back into one.
pub fn join_attribution_lines<S: AsRef<str>>(lines: &[S]) -> Result<String> {
    let mut assem = MergingOpAssembler::new();
    for line in lines {
        for op in deserialize_ops(line.as_ref()) {
            assem.append(op?);
        }
    }
    Ok(assem.to_string())
}

/// Like `substring` on a single-line attribution string: the attribution of
/// characters `start..end` (or `start..` when `end` is `None`).
pub fn subattribution(attribution: &str, start: usize, end: Option<usize>) -> Result<String> {
    // Only removes and plain keeps are applied, so no attribute lookups happen.
    let mut pool = AttributePool::new();
    let mut att_ops = deserialize_ops(attribution);
    let mut att = None;
    let mut assem = SmartOpAssembler::new();

    slice_through(Op::remove(start, 0), &mut att, &mut att_ops, &mut assem, &mut pool)?;
    match end {
        None => {
            if let Some(op) = att.take() {
                assem.append(op);
            }
            for op in att_ops {
                assem.append(op?);
            }
        }
        Some(end) => {
            let len = end
                .checked_sub(start)
                .ok_or_else(|| malformed(format!("subattribution end {end} before start {start}")))?;
            slice_through(Op::keep(len, 0), &mut att, &mut att_ops, &mut assem, &mut pool)?;
        }
    }
    Ok(assem.to_string())
}

fn slice_through(
    cs_op: Op,
    att: &mut Option<Op>,
    att_ops: &mut OpIter<'_>,
    assem: &mut SmartOpAssembler,
    pool: &mut AttributePool,
) -> Result<()> {
    let mut cs = (cs_op.chars > 0).then_some(cs_op);
    while cs.is_some() {
        if att.is_none() {
            match att_ops.next() {
                Some(op) => *att = Some(op?),
                None => break,
            }
        }
        if let (Some(c), Some(a)) = (cs.as_mut(), att.as_ref()) {
            // Covering a whole line-ending run covers its newline too.
            if c.chars >= a.chars && a.lines > 0 && c.lines == 0 {
                c.lines += 1;
            }
        }
        if let Some(out) = slicer_zipper(att, &mut cs, pool)? {
            assem.append(out);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::serialize_ops;

    fn ops_string(atext: &AText) -> String {
        serialize_ops(&ops_from_atext(atext).unwrap())
    }

    #[test]
    fn ops_from_atext_strips_final_newline() {
        assert_eq!(ops_string(&make_atext("\n", Some("|1+1"))), "");
        assert_eq!(ops_string(&make_atext("\n\n", Some("|2+2"))), "|1+1");
        assert_eq!(ops_string(&make_atext("\nfoo\n", Some("*x|2+5"))), "*x|1+1*x+3");
        assert_eq!(ops_string(&make_atext("\n\n\nfoo\n", Some("|2+2*x|2+5"))), "|2+2*x|1+1*x+3");
    }

    #[test]
    fn make_attribution_of_plain_text() {
        assert_eq!(make_attribution("hello\nworld\n"), "|2+c");
        assert_eq!(make_attribution("ab\ncd"), "|1+3+2");
        assert_eq!(make_attribution(""), "");
    }

    #[test]
    fn validate_checks_coverage() {
        assert!(make_atext("ab\n", None).validate().is_ok());
        assert!(make_atext("ab\n", Some("+3")).validate().is_err());
        assert!(make_atext("ab\n", Some("|1+2")).validate().is_err());
        assert!(make_atext("ab\n", Some("=3")).validate().is_err());
    }

    #[test]
    fn split_text_lines_keeps_newlines() {
        assert_eq!(split_text_lines("a\nb\nc"), vec!["a\n", "b\n", "c"]);
        assert_eq!(split_text_lines("a\n\n"), vec!["a\n", "\n"]);
        assert!(split_text_lines("").is_empty());
    }

    #[test]
    fn split_and_join_attribution_lines() {
        let text = "ab\ncd\n\nef\n";
        let lines = split_attribution_lines("*0|2+6|2+4", text).unwrap();
        assert_eq!(lines, vec!["*0|1+3", "*0|1+3", "|1+1", "|1+3"]);
        assert_eq!(join_attribution_lines(&lines).unwrap(), "*0|2+6|2+4");
    }

    #[test]
    fn subattribution_vectors() {
        let cases: &[(&str, usize, Option<usize>, &str)] = &[
            ("+1", 0, Some(0), ""),
            ("|1+1", 0, Some(1), "|1+1"),
            ("*0|1+1", 0, None, "*0|1+1"),
            ("*0+2+1*1+3", 0, Some(4), "*0+2+1*1+1"),
            ("*0+2+1*1+3", 0, Some(7), "*0+2+1*1+3"),
            ("*0+2+1*1+3", 2, None, "+1*1+3"),
            ("*0+2+1*1+3", 6, None, ""),
            ("*0+2+1*1|1+3", 0, Some(5), "*0+2+1*1+2"),
            ("*0+2+1*1|1+3", 0, Some(6), "*0+2+1*1|1+3"),
            ("*0+2+1*1|1+3", 4, None, "*1|1+2"),
            ("*0+2+1*1|1+3", 1, Some(5), "*0+1+1*1+2"),
            ("*0+2+1*1|1+3", 2, Some(6), "+1*1|1+3"),
        ];
        for (astr, start, end, expected) in cases {
            assert_eq!(
                subattribution(astr, *start, *end).unwrap(),
                *expected,
                "subattribution({astr:?}, {start}, {end:?})"
            );
        }
    }
}
