//! Rewriting attribute numbers inside serialized changesets and attribution
//! strings, e.g. to move them between pools.
//!
//! Only the text before the first `$` is touched, so char banks containing
//! `*` are safe.

use crate::attribs::parse_attrib_num;
use crate::error::Result;
use crate::num::push_num;
use crate::pool::AttributePool;

/// Rewrites every `*n` before the char bank with `f(n)`. `None` drops the
/// attribute.
pub fn map_attrib_numbers<F>(cs: &str, mut f: F) -> Result<String>
where
    F: FnMut(u32) -> Option<u32>,
{
    let split = cs.find('$').unwrap_or(cs.len());
    let (ops, bank) = cs.split_at(split);
    let mut out = String::with_capacity(cs.len());
    let mut rest = ops;
    while let Some(star) = rest.find('*') {
        out.push_str(&rest[..star]);
        let after = &rest[star + 1..];
        let digits = after
            .bytes()
            .take_while(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
            .count();
        if digits == 0 {
            out.push('*');
            rest = after;
            continue;
        }
        if let Some(n) = f(parse_attrib_num(&after[..digits])?) {
            out.push('*');
            push_num(&mut out, n as usize);
        }
        rest = &after[digits..];
    }
    out.push_str(rest);
    out.push_str(bank);
    Ok(out)
}

/// Keeps the attribute numbers for which `keep` returns true.
pub fn filter_attrib_numbers<F>(cs: &str, mut keep: F) -> Result<String>
where
    F: FnMut(u32) -> bool,
{
    map_attrib_numbers(cs, |n| keep(n).then_some(n))
}

/// Re-expresses the attributes of `cs` (a changeset or an attribution
/// string) against `new_pool`, interning them as needed. Numbers missing
/// from `old_pool` are dropped. Attribute order is preserved.
pub fn move_ops_to_new_pool(cs: &str, old_pool: &AttributePool, new_pool: &mut AttributePool) -> Result<String> {
    map_attrib_numbers(cs, |n| {
        let (key, value) = old_pool.get_attrib(n).ok()?;
        Some(new_pool.put_attrib(key, value))
    })
}

/// Translates `cs` into a fresh pool holding only the attributes it uses,
/// ready to be sent with it.
pub fn prepare_for_wire(cs: &str, pool: &AttributePool) -> Result<(String, AttributePool)> {
    let mut wire_pool = AttributePool::new();
    let translated = move_ops_to_new_pool(cs, pool, &mut wire_pool)?;
    Ok((translated, wire_pool))
}
