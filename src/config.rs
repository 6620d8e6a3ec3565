//! Per-run configuration for boundary discovery, ghost synthesis and exchange.
//!
//! A `BoundaryConfig` is handed to [`BoundaryRegistry::new`](crate::boundary::BoundaryRegistry::new)
//! and stays fixed for the registry's lifetime. It can be deserialized from any
//! serde format; missing fields take their defaults.

use crate::algs::communicator::{CommTag, ExchangeCommTags};
use crate::mesh_error::MeshHaloError;

/// How vector components are treated when a donor's axes are permuted or
/// reversed relative to the recipient.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VectorComponentPolicy {
    /// Copy components unchanged (components are physical, not index-aligned).
    #[default]
    Preserve,
    /// Permute and sign-flip 3-component vectors by the link orientation.
    FollowOrientation,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Ghost layers requested from a same-level neighbor.
    pub ghost_layers: u32,
    /// Create ghosts across faces only partially covered by a neighbor.
    pub create_ghosts_for_t_intersections: bool,
    /// Discover neighbors from declared extents instead of explicit candidate lists.
    pub compute_neighbors_from_extents: bool,
    /// Record edge and corner contacts in addition to face contacts.
    pub include_edge_and_corner_neighbors: bool,
    /// Same-level positive-volume overlap is tolerated (duplicated zones
    /// internal to the problem) instead of rejected.
    pub allow_duplicated_zones: bool,
    /// Periodic wrap per axis, as a period in level-0 point indices.
    pub periodic: [Option<i32>; 3],
    pub vector_components: VectorComponentPolicy,
    /// Base message tag for collective exchanges.
    pub comm_tag: u16,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            ghost_layers: 1,
            create_ghosts_for_t_intersections: true,
            compute_neighbors_from_extents: true,
            include_edge_and_corner_neighbors: true,
            allow_duplicated_zones: false,
            periodic: [None; 3],
            vector_components: VectorComponentPolicy::Preserve,
            comm_tag: 0x4D48,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> Result<(), MeshHaloError> {
        for (axis, p) in self.periodic.iter().enumerate() {
            if let Some(p) = p {
                if *p <= 0 {
                    return Err(MeshHaloError::InvalidConfig(format!(
                        "period on axis {axis} must be positive, got {p}"
                    )));
                }
            }
        }
        if self.comm_tag > u16::MAX - 2 {
            return Err(MeshHaloError::InvalidConfig(format!(
                "comm_tag {:#x} leaves no room for the data tag",
                self.comm_tag
            )));
        }
        Ok(())
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic.iter().any(Option::is_some)
    }

    /// Size and data tags for exchanges run under this configuration.
    pub fn comm_tags(&self) -> ExchangeCommTags {
        ExchangeCommTags::from_base(CommTag::new(self.comm_tag))
    }
}
