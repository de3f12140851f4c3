//! pad-changeset: changeset codec and operational-transformation engine for
//! collaborative plain-text pads.
//!
//! A changeset turns a text of one exact length into a text of another,
//! expressed as keep/insert/remove ops over attributed runs. The engine
//! parses and serializes the compact wire format, builds, applies, composes,
//! inverts and transforms changesets, and sequences them into a pad's
//! revision history.
//!
//! Every engine function is pure and synchronous. The [`AttributePool`] is
//! the only mutable shared state; callers serialize access to it per pad.

pub mod error;
pub mod num;
pub mod pool;
pub mod attribs;
pub mod op;
pub mod codec;
pub mod assembler;
mod cursor;
pub mod builder;
pub mod atext;
pub mod apply;
pub mod compose;
pub mod follow;
pub mod inverse;
pub mod splice;
pub mod translate;

pub mod pad;
pub mod fuzzer;
pub mod cli;

// Re-exports for convenience
pub use apply::{apply_to_atext, apply_to_attribution, apply_to_text};
pub use assembler::{MergingOpAssembler, OpAssembler, SmartOpAssembler};
pub use atext::{make_atext, AText};
pub use attribs::{attribute_tester, compose_attributes, follow_attributes, AttributeMap, Attribs};
pub use builder::Builder;
pub use codec::{check_rep, deserialize_ops, pack, unpack, Changeset};
pub use compose::compose;
pub use error::{ChangesetError, Result};
pub use follow::{follow, transform, Priority};
pub use inverse::inverse;
pub use op::{Op, OpCode};
pub use pad::{MemoryRevisionStore, Pad, PadOptions, Revision, RevisionStore};
pub use pool::AttributePool;
pub use splice::{character_range_follow, make_splice, to_splices, Splice};
pub use translate::{move_ops_to_new_pool, prepare_for_wire};
