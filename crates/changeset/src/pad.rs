//! Revision history of a single pad.
//!
//! # Overview
//!
//! A [`Pad`] owns the current document ([`AText`]), its [`AttributePool`] and
//! a [`RevisionStore`] holding one [`Revision`] per accepted change. Every
//! `key_revision_interval`-th revision also stores a snapshot of the pool and
//! the document, so any revision can be rebuilt by replaying the changesets
//! after the nearest snapshot.
//!
//! Client edits arrive against a possibly stale base revision. Accepting one
//! rebases it with [`follow`] over every revision the client has not seen,
//! with already-accepted text winning insert ties.
//!
//! A pad is single-writer: callers serialize access to it, including the
//! pool.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::apply::apply_to_atext;
use crate::atext::{make_atext, AText};
use crate::attribs::Attribs;
use crate::codec::{check_rep, Changeset};
use crate::compose::compose;
use crate::error::{malformed, ChangesetError, Result};
use crate::follow::follow;
use crate::pool::AttributePool;
use crate::splice::make_splice;
use crate::translate::move_ops_to_new_pool;

// ──────────────────────────────────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────────────────────────────────

/// One stored revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// The serialized changeset, in the pad pool's numbering.
    pub changeset: String,
    pub meta: RevisionMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionMeta {
    /// Author id, empty for system edits.
    pub author: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Pool snapshot, present on key revisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<AttributePool>,
    /// Document snapshot, present on key revisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atext: Option<AText>,
}

/// Storage for revision records.
pub trait RevisionStore {
    fn get_revision(&self, rev: usize) -> Result<Revision>;

    /// Stores revision `rev`, which is always one past the current head.
    fn put_revision(&mut self, rev: usize, revision: Revision) -> Result<()>;

    /// The newest stored revision, `None` while empty.
    fn head(&self) -> Option<usize>;
}

/// [`RevisionStore`] backed by a `Vec`.
#[derive(Debug, Clone, Default)]
pub struct MemoryRevisionStore {
    revisions: Vec<Revision>,
}

impl MemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn get_revision(&self, rev: usize) -> Result<Revision> {
        self.revisions
            .get(rev)
            .cloned()
            .ok_or(ChangesetError::UnknownRevision(rev))
    }

    fn put_revision(&mut self, rev: usize, revision: Revision) -> Result<()> {
        if rev != self.revisions.len() {
            return Err(ChangesetError::UnknownRevision(rev));
        }
        self.revisions.push(revision);
        Ok(())
    }

    fn head(&self) -> Option<usize> {
        self.revisions.len().checked_sub(1)
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadOptions {
    /// Revisions divisible by this store a pool and document snapshot.
    pub key_revision_interval: usize,
    /// Append a newline revision whenever an accepted edit leaves the text
    /// without a trailing newline.
    pub ensure_trailing_newline: bool,
    /// Text of revision 0, placed before the document's final newline.
    pub initial_text: String,
}

impl Default for PadOptions {
    fn default() -> Self {
        PadOptions {
            key_revision_interval: 100,
            ensure_trailing_newline: true,
            initial_text: String::new(),
        }
    }
}

impl PadOptions {
    /// Parses options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Normalizes line endings to `\n`, expands tabs to eight spaces and
/// replaces non-breaking spaces with plain ones.
pub fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "        ")
        .replace('\u{a0}', " ")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ──────────────────────────────────────────────────────────────────────────
// Pad
// ──────────────────────────────────────────────────────────────────────────

pub struct Pad<S: RevisionStore> {
    store: S,
    atext: AText,
    pool: AttributePool,
    head: Option<usize>,
    options: PadOptions,
}

impl<S: RevisionStore> Pad<S> {
    /// Creates a pad in an empty store. Revision 0 inserts
    /// `options.initial_text`.
    pub fn new(store: S, options: PadOptions) -> Result<Self> {
        if let Some(head) = store.head() {
            return Err(malformed(format!("revision store already holds {} revisions", head + 1)));
        }
        let mut pad = Pad {
            store,
            atext: make_atext("\n", None),
            pool: AttributePool::new(),
            head: None,
            options,
        };
        let text = clean_text(&pad.options.initial_text);
        let first = make_splice("\n", 0, 0, &text, Attribs::new())?;
        pad.append_revision(&first, "")?;
        Ok(pad)
    }

    pub fn text(&self) -> &str {
        &self.atext.text
    }

    pub fn atext(&self) -> &AText {
        &self.atext
    }

    pub fn pool(&self) -> &AttributePool {
        &self.pool
    }

    /// Mutable access to the pool, e.g. to intern attributes for a
    /// changeset built against it.
    pub fn pool_mut(&mut self) -> &mut AttributePool {
        &mut self.pool
    }

    pub fn head(&self) -> usize {
        self.head.unwrap_or(0)
    }

    pub fn options(&self) -> &PadOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn key_revision(&self, rev: usize) -> usize {
        let interval = self.options.key_revision_interval.max(1);
        rev / interval * interval
    }

    /// Applies `cs` (in the pad pool's numbering) as a new revision and
    /// returns the head.
    ///
    /// A changeset that changes neither the text nor the attributes stores
    /// nothing and returns the current head.
    pub fn append_revision(&mut self, cs: &Changeset, author: &str) -> Result<usize> {
        let atext = apply_to_atext(cs, &self.atext, &mut self.pool)?;
        if let Some(head) = self.head {
            if atext == self.atext {
                return Ok(head);
            }
        }
        self.atext = atext;
        let rev = self.head.map_or(0, |head| head + 1);
        if !author.is_empty() {
            self.pool.put_attrib("author", author);
        }

        let snapshot = rev == self.key_revision(rev);
        let revision = Revision {
            changeset: cs.to_string(),
            meta: RevisionMeta {
                author: author.to_string(),
                timestamp: now_millis(),
                pool: snapshot.then(|| self.pool.clone()),
                atext: snapshot.then(|| self.atext.clone()),
            },
        };
        self.store.put_revision(rev, revision)?;
        self.head = Some(rev);
        if snapshot {
            tracing::trace!(rev, "stored key revision snapshot");
        }
        Ok(rev)
    }

    /// Accepts a client changeset made against `base_rev`.
    ///
    /// `cs` is numbered against `wire_pool`. Every `author` attribute it
    /// carries must name `author`. Returns the new head.
    pub fn accept_changeset(
        &mut self,
        base_rev: usize,
        cs: &str,
        wire_pool: &AttributePool,
        author: &str,
    ) -> Result<usize> {
        let result = self.rebase_and_apply(base_rev, cs, wire_pool, author);
        if let Err(err) = &result {
            tracing::warn!(base_rev, author, error = %err, "rejected changeset");
        }
        result
    }

    fn rebase_and_apply(
        &mut self,
        base_rev: usize,
        cs: &str,
        wire_pool: &AttributePool,
        author: &str,
    ) -> Result<usize> {
        let parsed = check_rep(cs)?;
        for op in &parsed.ops {
            for (key, value) in op.attribs.resolve(wire_pool)? {
                if key == "author" && !value.is_empty() && value != author {
                    return Err(ChangesetError::AuthorMismatch {
                        expected: author.to_string(),
                        actual: value.to_string(),
                    });
                }
            }
        }

        let moved = move_ops_to_new_pool(cs, wire_pool, &mut self.pool)?;
        let mut rebased = Changeset::parse(&moved)?;
        let head = self.head();
        if base_rev > head {
            return Err(ChangesetError::UnknownRevision(base_rev));
        }
        for rev in base_rev + 1..=head {
            let record = self.store.get_revision(rev)?;
            if record.changeset == moved && record.meta.author == author {
                // Retransmission of a changeset that was already applied.
                rebased = Changeset::identity(rebased.old_len);
            }
            let accepted = Changeset::parse(&record.changeset)?;
            rebased = follow(&accepted, &rebased, false, &mut self.pool)?;
            tracing::trace!(rev, rebased = %rebased, "rebased changeset");
        }

        let len = self.atext.len();
        if rebased.old_len != len {
            return Err(ChangesetError::LengthMismatch { expected: rebased.old_len, actual: len });
        }
        let new_head = self.append_revision(&rebased, author)?;
        tracing::debug!(base_rev, head = new_head, author, "accepted changeset");

        if self.options.ensure_trailing_newline && !self.text().ends_with('\n') {
            let text = self.text().to_string();
            let fix = make_splice(&text, text.chars().count(), 0, "\n", Attribs::new())?;
            return self.append_revision(&fix, author);
        }
        Ok(new_head)
    }

    /// The document as of revision `rev`, replayed from the nearest key
    /// revision snapshot.
    pub fn atext_at(&mut self, rev: usize) -> Result<AText> {
        if rev > self.head() {
            return Err(ChangesetError::UnknownRevision(rev));
        }
        let key = self.key_revision(rev);
        let mut atext = self
            .store
            .get_revision(key)?
            .meta
            .atext
            .ok_or_else(|| malformed(format!("key revision {key} has no snapshot")))?;
        for r in key + 1..=rev {
            let cs = Changeset::parse(&self.store.get_revision(r)?.changeset)?;
            atext = apply_to_atext(&cs, &atext, &mut self.pool)?;
        }
        Ok(atext)
    }

    /// Composes the changesets of revisions `start + 1..=end` into one that
    /// turns revision `start` into revision `end`.
    pub fn compose_range(&mut self, start: usize, end: usize) -> Result<Changeset> {
        if end > self.head() {
            return Err(ChangesetError::UnknownRevision(end));
        }
        if start > end {
            return Err(ChangesetError::UnknownRevision(start));
        }
        let mut composed: Option<Changeset> = None;
        for rev in start + 1..=end {
            let cs = Changeset::parse(&self.store.get_revision(rev)?.changeset)?;
            composed = Some(match composed {
                None => cs,
                Some(prev) => compose(&prev, &cs, &mut self.pool)?,
            });
        }
        match composed {
            Some(cs) => Ok(cs),
            None => Ok(Changeset::identity(self.atext_at(start)?.len())),
        }
    }

    /// Every author id interned in the pool.
    pub fn all_authors(&self) -> Vec<String> {
        self.pool
            .iter()
            .filter(|(_, key, value)| *key == "author" && !value.is_empty())
            .map(|(_, _, value)| value.to_string())
            .collect()
    }

    /// Replaces `ndel` chars at `start` with `ins` (cleaned with
    /// [`clean_text`]), keeping the final newline. Returns the head.
    pub fn splice_text(&mut self, start: usize, ndel: usize, ins: &str, author: &str) -> Result<usize> {
        let orig = self.text().to_string();
        let len = orig.chars().count();
        if start.checked_add(ndel).map_or(true, |end| end > len) {
            return Err(ChangesetError::SpliceOutOfBounds { start, ndel, len });
        }
        let mut ins = clean_text(ins);
        let prev_is_newline = start > 0 && orig.chars().nth(start - 1) == Some('\n');
        let ends_with_newline =
            start + ndel < len || ins.ends_with('\n') || (ins.is_empty() && prev_is_newline);
        if !ends_with_newline {
            ins.push('\n');
        }
        if ndel == 0 && ins.is_empty() {
            return Ok(self.head());
        }
        let cs = make_splice(&orig, start, ndel, &ins, Attribs::new())?;
        self.append_revision(&cs, author)
    }

    /// Replaces the whole text.
    pub fn set_text(&mut self, text: &str, author: &str) -> Result<usize> {
        let len = self.atext.len();
        self.splice_text(0, len, text, author)
    }

    /// Inserts `text` before the final newline.
    pub fn append_text(&mut self, text: &str, author: &str) -> Result<usize> {
        let end = self.atext.len().saturating_sub(1);
        self.splice_text(end, 0, text, author)
    }
}
