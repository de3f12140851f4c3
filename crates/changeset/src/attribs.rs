//! Attribute strings (`*0*3*1c`) and the key/value view over them.
//!
//! An op's attributes are a list of pool indices. Two views exist:
//!
//! - [`Attribs`] is the raw, order-preserving list as it appears on the wire.
//! - [`AttributeMap`] resolves the list against a pool into a key -> value map
//!   and writes it back out in canonical order (sorted by key).

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{malformed, ChangesetError, Result};
use crate::num::{digit_value, num_to_string};
use crate::op::OpCode;
use crate::pool::AttributePool;

/// The attribute numbers attached to an op, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attribs(Vec<u32>);

impl Attribs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn contains(&self, num: u32) -> bool {
        self.0.contains(&num)
    }

    pub fn push(&mut self, num: u32) {
        self.0.push(num);
    }

    /// Decodes an attribute string such as `*0*1b`.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let mut nums = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'*' {
                return Err(malformed(format!("invalid attribute string: {s:?}")));
            }
            i += 1;
            let start = i;
            while i < bytes.len() && digit_value(bytes[i]).is_some() {
                i += 1;
            }
            nums.push(parse_attrib_num(&s[start..i])?);
        }
        Ok(Attribs(nums))
    }

    /// Resolves every number against `pool`.
    pub fn resolve<'p>(&self, pool: &'p AttributePool) -> Result<Vec<(&'p str, &'p str)>> {
        self.iter()
            .map(|n| {
                pool.get_attrib(n)
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .map_err(|_| ChangesetError::PoolResolution(n))
            })
            .collect()
    }

    /// Value of `key` in these attributes, `None` when no listed number
    /// resolves to that key. Works for an op through `op.attribs`.
    pub fn value_of<'p>(&self, key: &str, pool: &'p AttributePool) -> Option<&'p str> {
        self.iter()
            .filter_map(|n| pool.get_attrib(n).ok())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Interns `pairs` in the given order. No canonicalization is performed;
    /// use [`AttributeMap`] for that.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>, pool: &mut AttributePool) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| pool.put_attrib(k.as_ref(), v.as_ref()))
            .collect()
    }
}

/// Parses the radix-36 number of a single `*n` entry.
pub(crate) fn parse_attrib_num(s: &str) -> Result<u32> {
    let n = crate::num::parse_num(s)?;
    u32::try_from(n).map_err(|_| malformed(format!("attribute number out of range: {s}")))
}

impl From<Vec<u32>> for Attribs {
    fn from(nums: Vec<u32>) -> Self {
        Attribs(nums)
    }
}

impl FromIterator<u32> for Attribs {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Attribs(iter.into_iter().collect())
    }
}

impl fmt::Display for Attribs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.0 {
            write!(f, "*{}", num_to_string(*n as usize))?;
        }
        Ok(())
    }
}

impl FromStr for Attribs {
    type Err = ChangesetError;

    fn from_str(s: &str) -> Result<Self> {
        Attribs::parse(s)
    }
}

// ── AttributeMap ──────────────────────────────────────────────────────────

/// Key -> value view of an attribute list. Keys keep their first-insertion
/// position; [`AttributeMap::to_attribs`] sorts by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: IndexMap<String, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `attribs` against `pool`. Empty values are kept.
    pub fn from_attribs(attribs: &Attribs, pool: &AttributePool) -> Result<Self> {
        let mut map = AttributeMap::new();
        map.update_from_attribs(attribs, pool, false)?;
        Ok(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets every `(key, value)` in order. With `empty_value_is_delete`, an
    /// empty value deletes the key instead of storing it.
    pub fn update<K, V>(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
        empty_value_is_delete: bool,
    ) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in entries {
            let key = key.into();
            let value = value.into();
            if value.is_empty() && empty_value_is_delete {
                self.entries.shift_remove(&key);
            } else {
                self.entries.insert(key, value);
            }
        }
        self
    }

    /// Like [`update`](AttributeMap::update) with pairs decoded from `attribs`.
    pub fn update_from_attribs(
        &mut self,
        attribs: &Attribs,
        pool: &AttributePool,
        empty_value_is_delete: bool,
    ) -> Result<&mut Self> {
        let pairs = attribs.resolve(pool)?;
        Ok(self.update(pairs, empty_value_is_delete))
    }

    /// Interns the entries into `pool` and returns them sorted by key.
    pub fn to_attribs(&self, pool: &mut AttributePool) -> Attribs {
        let mut pairs: Vec<(&str, &str)> = self.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        Attribs::from_pairs(pairs, pool)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = AttributeMap::new();
        map.update(iter, false);
        map
    }
}

// ── Attribute algebra ─────────────────────────────────────────────────────

/// Builds the canonical attribute list for an op of kind `opcode`.
///
/// Remove ops carry no attributes. Insert ops drop empty values; keep ops
/// keep them as "clear this key" instructions.
pub fn make_attribs<K, V>(
    opcode: OpCode,
    pairs: impl IntoIterator<Item = (K, V)>,
    pool: &mut AttributePool,
) -> Attribs
where
    K: Into<String>,
    V: Into<String>,
{
    if opcode == OpCode::Remove {
        return Attribs::new();
    }
    let mut map = AttributeMap::new();
    map.update(pairs, opcode == OpCode::Insert);
    map.to_attribs(pool)
}

/// Applies the attribute change `att2` on top of `att1`.
///
/// When `result_is_mutation` the result is itself a change (an empty value
/// means "remove the key"); otherwise it is a presence set and empty values
/// delete the key.
///
/// | att1          | att2        | mutation | result        |
/// |---------------|-------------|----------|---------------|
/// | `[]`          | `[bold,]`   | yes      | `[bold,]`     |
/// | `[]`          | `[bold,]`   | no       | `[]`          |
/// | `[bold,true]` | `[bold,]`   | yes      | `[bold,]`     |
/// | `[bold,true]` | `[bold,]`   | no       | `[]`          |
pub fn compose_attributes(
    att1: &Attribs,
    att2: &Attribs,
    result_is_mutation: bool,
    pool: &mut AttributePool,
) -> Result<Attribs> {
    if att1.is_empty() && result_is_mutation {
        return Ok(att2.clone());
    }
    if att2.is_empty() {
        return Ok(att1.clone());
    }
    let mut map = AttributeMap::from_attribs(att1, pool)?;
    map.update_from_attribs(att2, pool, !result_is_mutation)?;
    Ok(map.to_attribs(pool))
}

/// Merges two concurrent attribute changes to the same text, producing the
/// change to apply after `att1`.
///
/// For a key both sides set, the lexically smaller value wins; when `att1`
/// already holds it the key is dropped from the result.
pub fn follow_attributes(att1: &Attribs, att2: &Attribs, pool: &mut AttributePool) -> Result<Attribs> {
    if att2.is_empty() {
        return Ok(Attribs::new());
    }
    if att1.is_empty() {
        return Ok(att2.clone());
    }
    let mut merged: IndexMap<String, String> = IndexMap::new();
    for (key, value) in att2.resolve(pool)? {
        merged.insert(key.to_string(), value.to_string());
    }
    for (key, value) in att1.resolve(pool)? {
        if merged.get(key).is_some_and(|theirs| value <= theirs.as_str()) {
            merged.shift_remove(key);
        }
    }
    Ok(Attribs::from_pairs(merged, pool))
}

/// Tests whether an attribute list contains one specific pooled pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTester {
    num: Option<u32>,
}

impl AttributeTester {
    pub fn matches(&self, attribs: &Attribs) -> bool {
        matches!(self.num, Some(n) if attribs.contains(n))
    }
}

/// Returns a tester for `(key, value)`. It never matches when the pair is not
/// pooled; the pool is not modified.
pub fn attribute_tester(key: &str, value: &str, pool: &AttributePool) -> AttributeTester {
    AttributeTester { num: pool.lookup(key, value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(pairs: &[(&str, &str)]) -> AttributePool {
        pairs.iter().copied().collect()
    }

    #[test]
    fn parse_and_display() {
        let attribs: Attribs = "*0*1b*asdf0".parse().unwrap();
        assert_eq!(attribs.as_slice(), &[0, 47, 18_119_916]);
        assert_eq!(attribs.to_string(), "*0*1b*asdf0");
        assert!(Attribs::parse("").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Attribs::parse("*").is_err());
        assert!(Attribs::parse("0").is_err());
        assert!(Attribs::parse("*1+").is_err());
        assert!(Attribs::parse("**1").is_err());
    }

    #[test]
    fn resolve_reports_missing_numbers() {
        let pool = pool_of(&[("bold", "true")]);
        let attribs: Attribs = "*0*5".parse().unwrap();
        assert!(matches!(attribs.resolve(&pool), Err(ChangesetError::PoolResolution(5))));
    }

    #[test]
    fn value_of_looks_up_one_key() {
        let pool: AttributePool = [("bold", "true"), ("author", "a1")].into_iter().collect();
        let attribs = Attribs::parse("*0*1").unwrap();
        assert_eq!(attribs.value_of("author", &pool), Some("a1"));
        assert_eq!(attribs.value_of("bold", &pool), Some("true"));
        assert_eq!(attribs.value_of("italic", &pool), None);
        assert_eq!(Attribs::new().value_of("bold", &pool), None);

        let op = crate::op::Op::new(crate::op::OpCode::Insert, 1, 0, Attribs::from(vec![1]));
        assert_eq!(op.attribs.value_of("author", &pool), Some("a1"));
    }

    #[test]
    fn attribute_map_sorts_by_key() {
        let mut pool = pool_of(&[("bold", "true"), ("author", "a1")]);
        let map: AttributeMap = [("bold", "true"), ("author", "a1")].into_iter().collect();
        assert_eq!(map.to_attribs(&mut pool).to_string(), "*1*0");
    }

    #[test]
    fn attribute_map_update_semantics() {
        let mut map = AttributeMap::new();
        map.update([("bold", "true"), ("italic", "true")], false);
        map.update([("bold", "")], true);
        assert_eq!(map.get("bold"), None);
        map.update([("italic", "")], false);
        assert_eq!(map.get("italic"), Some(""));
    }

    #[test]
    fn make_attribs_per_opcode() {
        let mut pool = pool_of(&[("abc", "def"), ("bold", "true")]);
        let ins = make_attribs(OpCode::Insert, [("bold", "true"), ("abc", "def")], &mut pool);
        assert_eq!(ins.to_string(), "*0*1");

        let mut pool = pool_of(&[("abc", "def"), ("bold", "")]);
        assert_eq!(make_attribs(OpCode::Keep, [("bold", "")], &mut pool).to_string(), "*1");
        assert_eq!(make_attribs(OpCode::Insert, [("bold", "")], &mut pool).to_string(), "");
        assert_eq!(make_attribs(OpCode::Remove, [("bold", "true")], &mut pool).to_string(), "");
    }

    #[test]
    fn compose_attributes_table() {
        let mut pool = pool_of(&[("bold", ""), ("bold", "true")]);
        let none = Attribs::new();
        let clear: Attribs = "*0".parse().unwrap();
        let set: Attribs = "*1".parse().unwrap();

        assert_eq!(compose_attributes(&none, &clear, true, &mut pool).unwrap(), clear);
        assert_eq!(compose_attributes(&none, &clear, false, &mut pool).unwrap(), none);
        assert_eq!(compose_attributes(&none, &set, true, &mut pool).unwrap(), set);
        assert_eq!(compose_attributes(&none, &set, false, &mut pool).unwrap(), set);
        assert_eq!(compose_attributes(&set, &clear, true, &mut pool).unwrap(), clear);
        assert_eq!(compose_attributes(&set, &clear, false, &mut pool).unwrap(), none);
    }

    #[test]
    fn follow_attributes_prefers_smaller_value() {
        let mut pool = pool_of(&[("color", "blue"), ("color", "red"), ("bold", "true")]);
        let blue: Attribs = "*0".parse().unwrap();
        let red: Attribs = "*1".parse().unwrap();
        let red_bold: Attribs = "*1*2".parse().unwrap();

        // att1 already set blue, which beats red: nothing left to apply.
        assert_eq!(follow_attributes(&blue, &red, &mut pool).unwrap(), Attribs::new());
        // att1 set red, att2 wants blue: blue wins.
        assert_eq!(follow_attributes(&red, &blue, &mut pool).unwrap(), blue);
        assert_eq!(follow_attributes(&blue, &red_bold, &mut pool).unwrap().to_string(), "*2");
        assert_eq!(follow_attributes(&Attribs::new(), &red, &mut pool).unwrap(), red);
        assert_eq!(follow_attributes(&red, &Attribs::new(), &mut pool).unwrap(), Attribs::new());
    }

    #[test]
    fn attribute_tester_matches_exact_numbers() {
        let pool = pool_of(&[("a", "1"), ("insertorder", "first")]);
        let tester = attribute_tester("insertorder", "first", &pool);
        assert!(tester.matches(&"*0*1".parse().unwrap()));
        assert!(!tester.matches(&"*0".parse().unwrap()));
        assert!(!tester.matches(&"*11".parse().unwrap()));

        let never = attribute_tester("missing", "x", &pool);
        assert!(!never.matches(&"*0*1".parse().unwrap()));
        assert_eq!(pool.len(), 2);
    }
}
