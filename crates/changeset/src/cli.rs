//! Core logic of the command-line tools:
//! - `changeset-apply`   apply a changeset to text read from stdin
//! - `changeset-compose` compose a chain of changesets
//! - `changeset-follow`  rebase one changeset over a concurrent one
//!
//! Attribute pools are passed as JSON in either persisted shape; an empty
//! input means an empty pool.

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::apply::apply_to_text;
use crate::codec::Changeset;
use crate::compose::compose;
use crate::error::{malformed, Result};
use crate::follow::follow;
use crate::pool::AttributePool;

/// Installs a `fmt` subscriber on stderr, filtered by `RUST_LOG`.
pub fn init_logging() {
    // Fails only if a subscriber is already installed, which is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses a pool from JSON. Blank input yields an empty pool.
pub fn load_pool(json: &str) -> Result<AttributePool> {
    if json.trim().is_empty() {
        return Ok(AttributePool::new());
    }
    let value: Value = serde_json::from_str(json)?;
    AttributePool::from_json(&value)
}

// ── changeset-apply ───────────────────────────────────────────────────────

pub fn apply_changeset(text: &str, cs: &str) -> Result<String> {
    let cs = Changeset::parse(cs)?;
    apply_to_text(&cs, text)
}

// ── changeset-compose ─────────────────────────────────────────────────────

/// Composes `changesets` left to right.
pub fn compose_changesets<S: AsRef<str>>(changesets: &[S], pool_json: &str) -> Result<String> {
    let mut pool = load_pool(pool_json)?;
    let mut iter = changesets.iter();
    let first = iter.next().ok_or_else(|| malformed("no changesets given"))?;
    let mut composed = Changeset::parse(first.as_ref())?;
    for cs in iter {
        composed = compose(&composed, &Changeset::parse(cs.as_ref())?, &mut pool)?;
    }
    Ok(composed.to_string())
}

// ── changeset-follow ──────────────────────────────────────────────────────

/// Rebases `cs2` so that it applies after `cs1`.
pub fn follow_changesets(cs1: &str, cs2: &str, reverse_insert_order: bool, pool_json: &str) -> Result<String> {
    let mut pool = load_pool(pool_json)?;
    let cs1 = Changeset::parse(cs1)?;
    let cs2 = Changeset::parse(cs2)?;
    Ok(follow(&cs1, &cs2, reverse_insert_order, &mut pool)?.to_string())
}
