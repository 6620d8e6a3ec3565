//! Read-only view of finished boundary data.
//!
//! Ghost synthesis and field exchange only ever consume a decomposition
//! through this trait, so they never reach into registry internals.

use crate::boundary::neighbor::NeighborLink;
use crate::config::BoundaryConfig;
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::{Domain, DomainId};
use crate::topology::refinement::RefinementLevels;

pub trait IndexTranslator {
    fn config(&self) -> &BoundaryConfig;
    fn levels(&self) -> &RefinementLevels;
    fn num_domains(&self) -> usize;

    /// A finished domain.
    ///
    /// # Errors
    /// `UnknownDomain` for ids outside the registry, `NotFinished` before
    /// `finish` has run for the domain.
    fn domain(&self, id: DomainId) -> Result<&Domain, MeshHaloError>;

    /// Frozen neighbor links of a finished domain.
    fn links(&self, id: DomainId) -> Result<&[NeighborLink], MeshHaloError>;

    /// Ids of every finished domain, ascending.
    fn finished_domains(&self) -> Vec<DomainId> {
        (0..self.num_domains())
            .map(DomainId::new)
            .filter(|&id| self.domain(id).is_ok())
            .collect()
    }
}
