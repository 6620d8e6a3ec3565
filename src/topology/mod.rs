//! Structured index-space primitives: extents, orientation, refinement and domains.

pub mod domain;
pub mod extents;
pub mod orientation;
pub mod refinement;

pub use domain::{Domain, DomainId};
pub use extents::{Centering, Face, IndexExtents};
pub use orientation::{AxisTransform, IndexTransform, Orientation};
pub use refinement::{RefinementLevels, RefinementRelationship};
