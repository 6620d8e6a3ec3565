#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-halo
//!
//! mesh-halo is the domain-boundary and ghost-zone engine for structured meshes split
//! into many logically rectangular domains, possibly across several AMR refinement
//! levels with anisotropic ratios. It discovers which domains touch, computes the exact
//! index mapping across every seam, synthesizes ghost nodes and zones, and fills them
//! with neighbor data so per-domain algorithms see consistent halos.
//!
//! ## Features
//! - Adjacency discovery from declared extents: faces, edges, corners, AMR nesting and
//!   periodic wrap, with a sweep-and-prune broad phase
//! - Orientation-aware index translation between domains and across refinement levels
//! - Ghost envelopes, ghost plans and per-slot ghost flags
//! - One generic exchanger for scalar, vector, material, mixed-material and coordinate
//!   payloads
//! - Pluggable collective transport (single worker, in-process, MPI)
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-halo = "0.3"
//! # Optional features:
//! # features = ["rayon", "mpi-support"]
//! ```
//!
//! A run declares domains on a [`BoundaryRegistry`](boundary::BoundaryRegistry), calls
//! `calculate_boundaries`, and then hands the registry to a
//! [`GhostSynthesizer`](ghost::GhostSynthesizer) or a
//! [`FieldExchanger`](algs::FieldExchanger):
//!
//! ```
//! use mesh_halo::prelude::*;
//!
//! let mut reg = BoundaryRegistry::new(BoundaryConfig::default())?;
//! reg.set_num_domains(2)?;
//! reg.set_extents(DomainId::new(0), IndexExtents::from_array([0, 5, 0, 4, 0, 0]))?;
//! reg.set_extents(DomainId::new(1), IndexExtents::from_array([5, 10, 0, 4, 0, 0]))?;
//! reg.calculate_boundaries()?;
//!
//! let zones = GhostSynthesizer::new(&reg).create_ghost_zones(&[DomainId::new(0)])?;
//! assert_eq!(zones[&DomainId::new(0)].count(GhostKind::GhostFromNeighbor), 4);
//! # Ok::<(), MeshHaloError>(())
//! ```
//!
//! ## Determinism
//!
//! Link order, ghost plans and exchange buffers depend only on finished link data, so
//! every worker derives the same plan for a seam without negotiating it.

pub mod algs;
pub mod boundary;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod ghost;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{
        CommTag, Communicator, ExchangeCommTags, NoComm, RayonComm,
    };
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::exchange::MpiExchange;
    pub use crate::algs::exchange::{
        CollectiveExchange, CommExchange, DomainFields, FieldExchanger, FieldPayload,
        LocalExchange,
    };
    pub use crate::boundary::{
        BoundaryRegistry, DomainState, IndexTranslator, NeighborLink, NeighborRelationship,
        NeighborSpec,
    };
    pub use crate::config::{BoundaryConfig, VectorComponentPolicy};
    pub use crate::data::{
        FieldAccess, FieldElement, MaterialFraction, MeshCoords, RaggedSection, Section,
    };
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::Contact;
    pub use crate::ghost::{GhostDataType, GhostFlags, GhostKind, GhostSynthesizer};
    pub use crate::mesh_error::{ErrorKind, MeshHaloError};
    pub use crate::topology::{
        AxisTransform, Centering, Domain, DomainId, Face, IndexExtents, IndexTransform,
        RefinementRelationship,
    };
}
