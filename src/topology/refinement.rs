//! AMR refinement levels and per-axis (possibly anisotropic) ratios.
//!
//! Level 0 is the coarsest root level; level `l + 1` refines level `l` by
//! `ratios[l]` along each axis.

use crate::mesh_error::MeshHaloError;

/// Resolution of a domain relative to a neighbor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RefinementRelationship {
    SameLevel,
    /// This domain is finer than its partner.
    Finer,
    /// This domain is coarser than its partner.
    Coarser,
}

impl RefinementRelationship {
    pub fn between(level: u32, partner_level: u32) -> Self {
        use std::cmp::Ordering::*;
        match level.cmp(&partner_level) {
            Equal => Self::SameLevel,
            Greater => Self::Finer,
            Less => Self::Coarser,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::SameLevel => Self::SameLevel,
            Self::Finer => Self::Coarser,
            Self::Coarser => Self::Finer,
        }
    }
}

/// Per-level refinement ratios.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RefinementLevels {
    ratios: Vec<[i32; 3]>,
}

impl RefinementLevels {
    /// Validate and store ratios; `ratios[l]` refines level `l` into `l + 1`.
    pub fn new(ratios: Vec<[i32; 3]>) -> Result<Self, MeshHaloError> {
        for (level, r) in ratios.iter().enumerate() {
            if r.iter().any(|&v| v < 1) {
                return Err(MeshHaloError::InvalidRefinementRatio { level, ratio: *r });
            }
        }
        Ok(Self { ratios })
    }

    /// Isotropic ratio `r` between every pair of consecutive levels.
    pub fn uniform(r: i32, levels: usize) -> Result<Self, MeshHaloError> {
        Self::new(vec![[r, r, r]; levels.saturating_sub(1)])
    }

    pub fn num_levels(&self) -> usize {
        self.ratios.len() + 1
    }

    pub fn ratio(&self, level: usize) -> Option<[i32; 3]> {
        self.ratios.get(level).copied()
    }

    /// Cumulative ratio from `coarse` up to `fine` (`fine >= coarse`).
    pub fn cumulative(&self, coarse: u32, fine: u32) -> Result<[i32; 3], MeshHaloError> {
        debug_assert!(fine >= coarse);
        let mut acc = [1; 3];
        for level in coarse..fine {
            let r = self.ratios.get(level as usize).ok_or_else(|| {
                MeshHaloError::InvalidConfig(format!(
                    "no refinement ratio declared between levels {level} and {}",
                    level + 1
                ))
            })?;
            for a in 0..3 {
                acc[a] *= r[a];
            }
        }
        Ok(acc)
    }

    /// Ratio between two levels regardless of order.
    pub fn between(&self, a: u32, b: u32) -> Result<[i32; 3], MeshHaloError> {
        self.cumulative(a.min(b), a.max(b))
    }

    /// Scale factor from level 0 to `level`.
    pub fn scale(&self, level: u32) -> Result<[i32; 3], MeshHaloError> {
        self.cumulative(0, level)
    }
}
