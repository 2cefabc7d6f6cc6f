//! Open-addressed hash tables with three interchangeable collision
//! policies and in-place resize.
//!
//! All three tables share the same surface and storage layout (a single
//! allocation holding the entries region followed by the per-policy
//! metadata region, which is what makes the in-place resize work) and
//! differ only in how they probe:
//!
//! * [`QuadraticTable`] — triangular-number probing with tombstones,
//! * [`HopscotchTable`] — neighborhood bitmaps and backward hopping,
//! * [`RobinHoodTable`] — probe-distance stealing and backward-shift
//!   removal.
//!
//! The tables store entries, not key-value pairs: the caller supplies a
//! 32-bit hash and a key-match predicate, and owns the lookup-then-insert
//! discipline (inserting a key that already has a live entry creates a
//! duplicate). Capacity is always a power of two ≥ 8; the number of live
//! entries never exceeds `threshold × capacity / 10` with the threshold
//! between 5 and 9. Iteration yields physical bucket order, which changes
//! arbitrarily across resizes.

mod hopscotch;
mod quadratic;
mod raw;
mod robinhood;

pub use hopscotch::HopscotchTable;
pub use quadratic::QuadraticTable;
pub use robinhood::RobinHoodTable;
