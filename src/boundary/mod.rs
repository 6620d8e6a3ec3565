//! Neighbor tables and the registry that owns them.

pub mod face_index;
pub mod neighbor;
pub mod perf;
pub mod registry;
pub mod translator;

pub use face_index::FaceIndex;
pub use neighbor::{NeighborLink, NeighborRelationship, NeighborSpec};
pub use registry::{BoundaryRecord, BoundaryRegistry, DomainState};
pub use translator::IndexTranslator;
