//! Region outline engine for the Parcel claim system.
//!
//! Turns an arbitrary set of owned cells into maximal 4-connected regions,
//! each carrying a rectilinear outline in world units: a clockwise exterior
//! ring plus counter-clockwise rings around enclosed unowned pockets. The
//! engine is pure computation over owned snapshots and never fails.
//!
//! # Modules
//!
//! - [`grid`] -- [`GridPos`] cell positions and axis [`Heading`]s.
//! - [`contact`] -- Classification of how a candidate cell touches a ring
//!   edge ([`EdgeContact`]).
//! - [`region`] -- [`Region`] with incremental [`Region::try_consume`].
//! - [`merge`] -- Greedy grouping of a claimant's cells into regions.
//! - [`corners`] -- Local per-corner vertex classification, used to
//!   cross-check traced outlines.
//!
//! Ring tracing and normalisation live in the private `ring` module.

pub mod contact;
pub mod corners;
pub mod grid;
pub mod merge;
pub mod region;

mod ring;

// Re-export primary types at crate root.
pub use contact::{Adjacency, Contact, EdgeContact};
pub use corners::{Corner, CornerKind};
pub use grid::{GridPos, Heading};
pub use merge::{merge, merge_in_order};
pub use region::Region;
