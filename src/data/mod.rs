//! Data module: field elements, structured sections and ragged records
#![warn(missing_docs)]

pub mod coords;
pub mod element;
pub mod ragged;
pub mod section;

pub use coords::MeshCoords;
pub use element::FieldElement;
pub use ragged::{MaterialFraction, RaggedSection};
pub use section::{FieldAccess, Section};

/// Per-zone material chains.
pub type MaterialSection = RaggedSection<MaterialFraction>;

/// Per-zone mixed-material variable chains.
pub type MixVarSection<T> = RaggedSection<T>;
