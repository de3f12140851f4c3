//! Error type shared by every changeset operation.
//!
//! All engine functions are pure, so every error is deterministic for a given
//! input. Callers recover structurally (resync the revision, rebuild or merge
//! the attribute pool), never by retrying the same call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangesetError {
    /// Codec or structural invariant violation: bad header, unknown op token,
    /// a char bank that does not match the insert ops, an op stream that is
    /// not position-complete, or a changeset that is not in canonical form.
    #[error("malformed changeset: {0}")]
    Malformed(String),

    /// `compose(a, b)` where `a.new_len != b.old_len`.
    #[error("mismatched composition: first changeset produces {left_new} chars, second expects {right_old}")]
    IncompatibleLengths { left_new: usize, right_old: usize },

    /// `follow`/`transform` over changesets with different base lengths.
    #[error("mismatched base length: {left} != {right}")]
    IncompatibleBaseLength { left: usize, right: usize },

    /// An attribute number referenced by a changeset is not in the pool used
    /// to resolve it.
    #[error("attribute {0} does not exist in pool")]
    PoolResolution(u32),

    /// `AttributePool::get_attrib` (or a translation table lookup) with an
    /// index that was never assigned.
    #[error("attribute index {0} out of range")]
    OutOfRange(u32),

    /// A `Builder` was finalized without covering exactly `old_len` chars.
    #[error("incomplete changeset: expected {expected} consumed chars, got {actual}")]
    IncompleteChangeset { expected: usize, actual: usize },

    /// The text a changeset is applied to does not have the length it expects.
    #[error("mismatched apply: text has {actual} chars, changeset expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// `AttributePool::check` found an inconsistency.
    #[error("inconsistent attribute pool: {0}")]
    Pool(String),

    /// A changeset carried an `author` attribute for somebody other than the
    /// submitting author.
    #[error("author {expected} tried to submit changes as author {actual}")]
    AuthorMismatch { expected: String, actual: String },

    #[error("unknown revision {0}")]
    UnknownRevision(usize),

    /// A splice reaching past the end of the pad text.
    #[error("splice {start}+{ndel} reaches past the end of a {len}-char text")]
    SpliceOutOfBounds { start: usize, ndel: usize, len: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChangesetError>;

/// Shorthand for a [`ChangesetError::Malformed`] error.
pub(crate) fn malformed(msg: impl Into<String>) -> ChangesetError {
    ChangesetError::Malformed(msg.into())
}
