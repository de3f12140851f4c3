//! Sequential composition of changesets.

use crate::codec::Changeset;
use crate::cursor::{apply_zip, slicer_zipper, CharCursor};
use crate::error::{ChangesetError, Result};
use crate::op::OpCode;
use crate::pool::AttributePool;

/// Composes `cs1` and `cs2` into one changeset equivalent to applying `cs1`
/// and then `cs2`.
///
/// Text inserted by `cs1` and removed by `cs2` leaves no trace in the result.
/// Composition is associative.
pub fn compose(cs1: &Changeset, cs2: &Changeset, pool: &mut AttributePool) -> Result<Changeset> {
    if cs1.new_len != cs2.old_len {
        return Err(ChangesetError::IncompatibleLengths {
            left_new: cs1.new_len,
            right_old: cs2.old_len,
        });
    }
    cs1.validate()?;
    cs2.validate()?;

    let mut bank1 = CharCursor::new(&cs1.char_bank);
    let mut bank2 = CharCursor::new(&cs2.char_bank);
    let mut char_bank = String::new();

    let ops = apply_zip(cs1.ops.iter().cloned(), cs2.ops.iter().cloned(), |op1, op2| {
        let code2 = op2.as_ref().map(|op| op.opcode);
        if let (Some(a), Some(b)) = (op1.as_ref(), op2.as_ref()) {
            if a.opcode == OpCode::Insert && b.opcode == OpCode::Remove {
                bank1.skip(a.chars.min(b.chars))?;
            }
        }
        let out = slicer_zipper(op1, op2, pool)?;
        if let Some(op) = &out {
            if op.opcode == OpCode::Insert {
                let chars = if code2 == Some(OpCode::Insert) {
                    bank2.take(op.chars)?
                } else {
                    bank1.take(op.chars)?
                };
                char_bank.push_str(chars);
            }
        }
        Ok(out)
    })?;

    Ok(Changeset {
        old_len: cs1.old_len,
        new_len: cs2.new_len,
        ops,
        char_bank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_to_text;

    fn cs(s: &str) -> Changeset {
        Changeset::parse(s).unwrap()
    }

    #[test]
    fn insert_then_remove_cancels() {
        let mut pool = AttributePool::new();
        let composed = compose(&cs("Z:3>3=1+3$abc"), &cs("Z:6<3=1-3$"), &mut pool).unwrap();
        assert_eq!(composed.to_string(), "Z:3>0$");
        assert!(composed.is_identity());
    }

    #[test]
    fn keep_then_remove_removes_original_text() {
        let mut pool = AttributePool::new();
        let composed = compose(&cs("Z:4>1+1$x"), &cs("Z:5<2=2-2$"), &mut pool).unwrap();
        assert_eq!(composed.to_string(), "Z:4<1+1=1-2$x");
        assert_eq!(apply_to_text(&composed, "abc\n").unwrap(), "xa\n");
    }

    #[test]
    fn removes_from_first_pass_through() {
        let mut pool = AttributePool::new();
        let composed = compose(&cs("Z:5<2-2$"), &cs("Z:3>2+2$xy"), &mut pool).unwrap();
        assert_eq!(composed.to_string(), "Z:5>0-2+2$xy");
    }

    #[test]
    fn composes_attributes() {
        let mut pool: AttributePool = [("bold", ""), ("bold", "true")].into_iter().collect();
        let composed = compose(&cs("Z:2>1*1+1*1=1$x"), &cs("Z:3>0*0|1=3$"), &mut pool).unwrap();
        assert_eq!(composed.to_string(), "Z:2>1+1*0|1=2$x");
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let mut pool = AttributePool::new();
        assert!(matches!(
            compose(&cs("Z:4>1+1$x"), &cs("Z:4>0$"), &mut pool),
            Err(ChangesetError::IncompatibleLengths { left_new: 5, right_old: 4 })
        ));
    }
}
