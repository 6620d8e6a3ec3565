//! Index-space geometry between structured domains.
//!
//! [`adjacency`] decides whether and how two domains touch; [`sweep`] is the
//! broad phase that keeps bulk discovery away from all-pairs cost.

pub mod adjacency;
pub mod sweep;

pub use adjacency::{Adjacency, Contact, compute_adjacency, compute_periodic_adjacencies};
pub use sweep::{SweepEntry, candidate_pairs};
