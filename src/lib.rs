// plinth — containers and low-level primitives

pub mod array;
pub mod btree;
pub mod charconv;
pub mod dstring;
pub mod fortify;
pub mod hash;
pub mod hashtable;
pub mod heap;
pub mod rbtree;
pub mod utils;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level convenience re-exports for the most common entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Growable vector with a header-prefixed allocation.
pub use array::Array;

/// Ordered set over a configurable-fan-out B-tree.
pub use btree::BTree;
/// Ordered map over a configurable-fan-out B-tree.
pub use btree::BTreeMap;

/// Write the textual representation of an integer into a byte buffer.
pub use charconv::to_chars;
/// Parse an integer from the longest valid prefix of a byte buffer.
pub use charconv::from_chars;
/// Structured result of [`from_chars`].
pub use charconv::FromCharsResult;

/// Dynamic byte string with a three-shape small-buffer optimization.
pub use dstring::DStr;

/// 64-bit SipHash-2-4 of a keyed byte string.
pub use hash::siphash24_64;
/// 32-bit MurmurHash3 (x86 variant) of a seeded byte string.
pub use hash::murmurhash3_x86_32;

/// Open-addressed table with triangular-number quadratic probing.
pub use hashtable::QuadraticTable;
/// Open-addressed table with hopscotch hashing.
pub use hashtable::HopscotchTable;
/// Open-addressed table with Robin Hood probing and backward-shift removal.
pub use hashtable::RobinHoodTable;

/// Intrusive red-black tree.
pub use rbtree::{RbDirection, RbNode, RbTree};
