//! Attribute pool: interns `(key, value)` pairs to small integers.
//!
//! Indices are assigned in insertion order and never change for the lifetime
//! of a pool. The pool is append-only; `put_attrib` is its only mutator, and
//! the caller is responsible for serializing access to it (one writer per
//! document).

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChangesetError, Result};

/// A `(key, value)` attribute pair. An empty value is meaningful: inside a
/// keep op it instructs removal of the key.
pub type Attribute = (String, String);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PoolJson", into = "PoolJson")]
pub struct AttributePool {
    attribs: IndexSet<Attribute>,
}

impl AttributePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `(key, value)`, interning the pair if it is new.
    pub fn put_attrib(&mut self, key: &str, value: &str) -> u32 {
        let (index, _) = self.attribs.insert_full((key.to_string(), value.to_string()));
        index as u32
    }

    /// Returns the index of `(key, value)` without creating it.
    pub fn lookup(&self, key: &str, value: &str) -> Option<u32> {
        self.attribs
            .get_index_of(&(key.to_string(), value.to_string()))
            .map(|i| i as u32)
    }

    /// Returns the pair at `index`, or [`ChangesetError::OutOfRange`].
    pub fn get_attrib(&self, index: u32) -> Result<&Attribute> {
        self.attribs
            .get_index(index as usize)
            .ok_or(ChangesetError::OutOfRange(index))
    }

    pub fn get_attrib_key(&self, index: u32) -> Option<&str> {
        self.attribs.get_index(index as usize).map(|(k, _)| k.as_str())
    }

    pub fn get_attrib_value(&self, index: u32) -> Option<&str> {
        self.attribs.get_index(index as usize).map(|(_, v)| v.as_str())
    }

    /// Iterates `(index, key, value)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &str)> + '_ {
        self.attribs
            .iter()
            .enumerate()
            .map(|(i, (k, v))| (i as u32, k.as_str(), v.as_str()))
    }

    /// Calls `f(key, value)` for every pair in index order.
    pub fn each_attrib(&self, mut f: impl FnMut(&str, &str)) {
        for (_, k, v) in self.iter() {
            f(k, v);
        }
    }

    pub fn len(&self) -> usize {
        self.attribs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribs.is_empty()
    }

    /// Validates that indices are contiguous from zero and that every pair
    /// maps back to its own index.
    pub fn check(&self) -> Result<()> {
        if self.attribs.len() > u32::MAX as usize {
            return Err(ChangesetError::Pool(format!(
                "{} attributes exceed the index space",
                self.attribs.len()
            )));
        }
        for (i, attrib) in self.attribs.iter().enumerate() {
            match self.attribs.get_index_of(attrib) {
                Some(j) if j == i => {}
                _ => {
                    return Err(ChangesetError::Pool(format!(
                        "attribute {:?} at index {i} does not map back to its index",
                        attrib
                    )))
                }
            }
        }
        Ok(())
    }

    /// Interns every pair of `other` into `self`.
    ///
    /// Returns the translation table: entry `i` is the local index of
    /// `other`'s attribute `i`. Existing local indices are untouched.
    pub fn merge(&mut self, other: &AttributePool) -> Vec<u32> {
        let before = self.len();
        let table: Vec<u32> = other.iter().map(|(_, k, v)| self.put_attrib(k, v)).collect();
        tracing::debug!(
            foreign = other.len(),
            added = self.len() - before,
            "merged attribute pool"
        );
        table
    }

    /// Serializes into the persisted JSON shape
    /// `{"numToAttrib": {"0": [k, v], ...}, "nextNum": n}`.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(PoolJson::from(self.clone()))?)
    }

    /// Loads a pool from either the object form written by [`to_json`] or the
    /// array form `{"numToAttrib": [[k, v], ...]}`.
    ///
    /// [`to_json`]: AttributePool::to_json
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributePool {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut pool = AttributePool::new();
        for (k, v) in iter {
            pool.attribs.insert((k.into(), v.into()));
        }
        pool
    }
}

// ── JSON shape ────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolJson {
    num_to_attrib: NumToAttrib,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_num: Option<u32>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NumToAttrib {
    List(Vec<Attribute>),
    Map(IndexMap<String, Attribute>),
}

impl From<AttributePool> for PoolJson {
    fn from(pool: AttributePool) -> Self {
        let next_num = pool.len() as u32;
        let map = pool
            .attribs
            .into_iter()
            .enumerate()
            .map(|(i, attrib)| (i.to_string(), attrib))
            .collect();
        PoolJson {
            num_to_attrib: NumToAttrib::Map(map),
            next_num: Some(next_num),
        }
    }
}

impl TryFrom<PoolJson> for AttributePool {
    type Error = ChangesetError;

    fn try_from(json: PoolJson) -> Result<Self> {
        let ordered: Vec<Attribute> = match json.num_to_attrib {
            NumToAttrib::List(list) => list,
            NumToAttrib::Map(map) => {
                let mut numbered = Vec::with_capacity(map.len());
                for (key, attrib) in map {
                    let n: usize = key
                        .parse()
                        .map_err(|_| ChangesetError::Pool(format!("invalid attribute number {key:?}")))?;
                    numbered.push((n, attrib));
                }
                numbered.sort_by_key(|(n, _)| *n);
                for (expected, (n, _)) in numbered.iter().enumerate() {
                    if *n != expected {
                        return Err(ChangesetError::Pool(format!(
                            "attribute numbers are not contiguous: expected {expected}, found {n}"
                        )));
                    }
                }
                numbered.into_iter().map(|(_, attrib)| attrib).collect()
            }
        };
        let mut pool = AttributePool::new();
        for (key, value) in &ordered {
            if !pool.attribs.insert((key.clone(), value.clone())) {
                return Err(ChangesetError::Pool(format!(
                    "duplicate attribute [{key:?}, {value:?}]"
                )));
            }
        }
        if let Some(next_num) = json.next_num {
            if next_num as usize != pool.len() {
                return Err(ChangesetError::Pool(format!(
                    "nextNum is {next_num} but the pool holds {} attributes",
                    pool.len()
                )));
            }
        }
        Ok(pool)
    }
}
