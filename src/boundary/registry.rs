//! `BoundaryRegistry`: owns every domain's boundary record.
//!
//! # Lifecycle
//! Each domain moves through `Unregistered → ExtentsSet → NeighborsDiscovered
//! → Finished`. Only finished domains are visible through
//! [`IndexTranslator`]; a finished domain's links are frozen. Declaring new
//! extents for a domain sends it back to `ExtentsSet` and un-finishes every
//! domain that links to it, since their links now describe a stale grid.
//!
//! # Discovery
//! [`calculate_boundaries`](BoundaryRegistry::calculate_boundaries) finds
//! candidate pairs with a sort-and-sweep broad phase (or from explicit
//! candidate lists), runs [`compute_periodic_adjacencies`] on each pair and
//! stores both directions of every touch. Pairs are processed in ascending
//! order, so the resulting link lists do not depend on thread scheduling.

use crate::boundary::face_index::FaceIndex;
use crate::boundary::neighbor::{NeighborLink, NeighborRelationship, NeighborSpec, link_pair};
use crate::boundary::perf::FastSet;
use crate::boundary::translator::IndexTranslator;
use crate::config::BoundaryConfig;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::adjacency::{compute_periodic_adjacencies, masked_ratio};
use crate::geometry::sweep::{SweepEntry, candidate_pairs};
use crate::ghost::flags::GhostDataType;
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::{Domain, DomainId};
use crate::topology::extents::{Face, IndexExtents};
use crate::topology::orientation::AxisTransform;
use crate::topology::refinement::{RefinementLevels, RefinementRelationship};
use itertools::{Itertools, iproduct};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DomainState {
    #[default]
    Unregistered,
    ExtentsSet,
    NeighborsDiscovered,
    Finished,
}

/// Boundary bookkeeping for one domain.
#[derive(Clone, Debug, Default)]
pub struct BoundaryRecord {
    domain: Option<Domain>,
    state: DomainState,
    links: Vec<NeighborLink>,
    /// Extents the current links were computed for.
    old_extents: Option<IndexExtents>,
    face_index: Option<FaceIndex>,
    candidates: Option<Vec<DomainId>>,
}

impl BoundaryRecord {
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    pub fn state(&self) -> DomainState {
        self.state
    }

    pub fn links(&self) -> &[NeighborLink] {
        &self.links
    }

    pub fn old_extents(&self) -> Option<IndexExtents> {
        self.old_extents
    }

    pub fn new_extents(&self) -> Option<IndexExtents> {
        self.domain.as_ref().map(|d| d.extents)
    }

    fn unfinish(&mut self) {
        if self.state == DomainState::Finished {
            self.state = DomainState::NeighborsDiscovered;
        }
        self.face_index = None;
    }

    fn clear_links(&mut self) {
        self.links.clear();
        self.face_index = None;
        self.old_extents = self.new_extents();
        self.state = if self.domain.is_some() {
            DomainState::ExtentsSet
        } else {
            DomainState::Unregistered
        };
    }
}

#[derive(Clone, Debug)]
pub struct BoundaryRegistry {
    config: BoundaryConfig,
    levels: RefinementLevels,
    records: Vec<BoundaryRecord>,
}

impl BoundaryRegistry {
    pub fn new(config: BoundaryConfig) -> Result<Self, MeshHaloError> {
        config.validate()?;
        Ok(Self {
            config,
            levels: RefinementLevels::default(),
            records: Vec::new(),
        })
    }

    fn any_finished(&self) -> bool {
        self.records.iter().any(|r| r.state == DomainState::Finished)
    }

    fn record(&self, d: DomainId) -> Result<&BoundaryRecord, MeshHaloError> {
        self.records
            .get(d.get())
            .ok_or(MeshHaloError::UnknownDomain(d))
    }

    fn record_mut(&mut self, d: DomainId) -> Result<&mut BoundaryRecord, MeshHaloError> {
        self.records
            .get_mut(d.get())
            .ok_or(MeshHaloError::UnknownDomain(d))
    }

    fn finished_record(&self, d: DomainId) -> Result<&BoundaryRecord, MeshHaloError> {
        let rec = self.record(d)?;
        if rec.state != DomainState::Finished {
            return Err(MeshHaloError::NotFinished(d));
        }
        Ok(rec)
    }

    fn declared(&self, d: DomainId) -> Result<&Domain, MeshHaloError> {
        self.record(d)?
            .domain
            .as_ref()
            .ok_or(MeshHaloError::MissingExtents(d))
    }

    /// Allocate `n` empty records, discarding all previous state.
    pub fn set_num_domains(&mut self, n: usize) -> Result<(), MeshHaloError> {
        if self.any_finished() {
            return Err(MeshHaloError::DomainsFinalized);
        }
        self.records = vec![BoundaryRecord::default(); n];
        Ok(())
    }

    /// Ratios between consecutive levels; `ratios[l]` refines level `l` into `l + 1`.
    pub fn set_refinement_ratios(&mut self, ratios: Vec<[i32; 3]>) -> Result<(), MeshHaloError> {
        if self.any_finished() {
            return Err(MeshHaloError::DomainsFinalized);
        }
        self.levels = RefinementLevels::new(ratios)?;
        Ok(())
    }

    /// Declare point extents; the domain keeps any level already assigned.
    pub fn set_extents(&mut self, d: DomainId, extents: IndexExtents) -> Result<(), MeshHaloError> {
        self.declare(d, None, extents)
    }

    /// Declare an AMR patch: point extents in the index space of `level`.
    pub fn set_indices_for_amr_patch(
        &mut self,
        d: DomainId,
        level: u32,
        extents: IndexExtents,
    ) -> Result<(), MeshHaloError> {
        self.declare(d, Some(level), extents)
    }

    fn declare(
        &mut self,
        d: DomainId,
        level: Option<u32>,
        extents: IndexExtents,
    ) -> Result<(), MeshHaloError> {
        if !extents.is_valid() {
            return Err(MeshHaloError::InvalidExtents { domain: d, extents });
        }
        let rec = self.record_mut(d)?;
        let next = match &rec.domain {
            Some(prev) => Domain {
                extents,
                level: level.unwrap_or(prev.level),
                ..prev.clone()
            },
            None => Domain::new(d, extents).with_level(level.unwrap_or(0)),
        };
        if rec.domain.as_ref() == Some(&next) {
            return Ok(());
        }
        rec.domain = Some(next);
        if rec.links.is_empty() {
            rec.old_extents = Some(extents);
        } else {
            log::debug!("domain {d} changed to {extents}; its links are now stale");
        }
        rec.state = DomainState::ExtentsSet;
        rec.face_index = None;

        for other in &mut self.records {
            if other.links.iter().any(|l| l.partner == d) {
                other.unfinish();
            }
        }
        Ok(())
    }

    /// Worker holding the domain's field data.
    pub fn set_owner(&mut self, d: DomainId, owner: usize) -> Result<(), MeshHaloError> {
        let rec = self.record_mut(d)?;
        let dom = rec.domain.as_mut().ok_or(MeshHaloError::MissingExtents(d))?;
        dom.owner = owner;
        Ok(())
    }

    /// Local index frame of the domain (local axes onto global axes).
    pub fn set_frame(&mut self, d: DomainId, frame: AxisTransform) -> Result<(), MeshHaloError> {
        let rec = self.record_mut(d)?;
        if rec.state == DomainState::Finished {
            return Err(MeshHaloError::AlreadyFinished(d));
        }
        let dom = rec.domain.as_mut().ok_or(MeshHaloError::MissingExtents(d))?;
        dom.frame = frame;
        Ok(())
    }

    /// Explicit neighbor candidates, used when discovery is not driven by extents.
    pub fn set_neighbor_candidates(
        &mut self,
        d: DomainId,
        candidates: Vec<DomainId>,
    ) -> Result<(), MeshHaloError> {
        for &c in &candidates {
            self.record(c)?;
        }
        self.record_mut(d)?.candidates = Some(candidates);
        Ok(())
    }

    /// Append an explicitly declared link. Duplicate detection is the caller's job.
    pub fn add_neighbor(&mut self, d: DomainId, spec: NeighborSpec) -> Result<(), MeshHaloError> {
        if self.record(d)?.state == DomainState::Finished {
            return Err(MeshHaloError::AlreadyFinished(d));
        }
        let a = self.declared(d)?.clone();
        let b = self.declared(spec.partner)?;
        let link = NeighborLink::build(&a, b, spec, &self.config)?;
        let rec = self.record_mut(d)?;
        if rec.links.is_empty() {
            rec.old_extents = Some(a.extents);
        }
        rec.links.push(link);
        rec.state = DomainState::NeighborsDiscovered;
        Ok(())
    }

    /// Freeze the domain's links and build its face index.
    ///
    /// # Errors
    /// `InconsistentExtents` if the domain or any partner changed extents
    /// since the links were computed.
    pub fn finish(&mut self, d: DomainId) -> Result<(), MeshHaloError> {
        let rec = self.record(d)?;
        if rec.state == DomainState::Finished {
            return Ok(());
        }
        let current = rec
            .domain
            .as_ref()
            .ok_or(MeshHaloError::MissingExtents(d))?
            .extents;
        if let Some(old) = rec.old_extents {
            if !rec.links.is_empty() && old != current {
                return Err(MeshHaloError::InconsistentExtents {
                    domain: d,
                    old,
                    new: current,
                });
            }
        }
        for link in &rec.links {
            let partner = self.declared(link.partner)?;
            if partner.extents != link.partner_extents {
                return Err(MeshHaloError::InconsistentExtents {
                    domain: link.partner,
                    old: link.partner_extents,
                    new: partner.extents,
                });
            }
        }
        let index = FaceIndex::build(&rec.links);
        let rec = self.record_mut(d)?;
        rec.face_index = Some(index);
        rec.old_extents = Some(current);
        rec.state = DomainState::Finished;
        Ok(())
    }

    /// Drop every link from `d` to a domain in `related`.
    ///
    /// Donor/recipient links are one half of a nesting relationship; their
    /// mirror on the partner's record is removed too. Any record that loses a
    /// link is no longer finished. Returns the number of links removed from `d`.
    pub fn delete_neighbor(
        &mut self,
        d: DomainId,
        related: &[DomainId],
    ) -> Result<usize, MeshHaloError> {
        for &r in related {
            self.record(r)?;
        }
        let rec = self.record_mut(d)?;
        let mut mirrors = Vec::new();
        let before = rec.links.len();
        rec.links.retain(|l| {
            let drop = related.contains(&l.partner);
            if drop && l.relationship != NeighborRelationship::Symmetric {
                mirrors.push((l.partner, l.match_index));
            }
            !drop
        });
        let removed = before - rec.links.len();
        if removed > 0 {
            rec.unfinish();
            if rec.links.is_empty() {
                rec.old_extents = rec.new_extents();
            }
        }

        for (partner, match_index) in mirrors {
            let prec = self.record_mut(partner)?;
            let before = prec.links.len();
            prec.links.retain(|l| {
                !(l.partner == d
                    && l.match_index == match_index
                    && l.relationship != NeighborRelationship::Symmetric)
            });
            if prec.links.len() != before {
                prec.unfinish();
            }
        }
        Ok(removed)
    }

    /// Discover every link from declared extents and finish all declared domains.
    pub fn calculate_boundaries(&mut self) -> Result<(), MeshHaloError> {
        let pairs = if self.config.compute_neighbors_from_extents {
            self.sweep_pairs()?
        } else {
            self.explicit_pairs()
        };

        #[cfg(feature = "rayon")]
        let found: Vec<Vec<(usize, NeighborLink)>> = pairs
            .par_iter()
            .map(|&(i, j)| self.discover_pair(i, j))
            .collect::<Result<_, _>>()?;
        #[cfg(not(feature = "rayon"))]
        let found: Vec<Vec<(usize, NeighborLink)>> = pairs
            .iter()
            .map(|&(i, j)| self.discover_pair(i, j))
            .collect::<Result<_, _>>()?;

        for rec in &mut self.records {
            rec.clear_links();
        }
        let mut total = 0usize;
        for (owner, link) in found.into_iter().flatten() {
            self.records[owner].links.push(link);
            total += 1;
        }
        for rec in &mut self.records {
            rec.links
                .sort_by_key(|l| (l.partner, l.match_index, l.transform.offset));
            if rec.domain.is_some() {
                rec.state = DomainState::NeighborsDiscovered;
            }
        }
        for id in 0..self.records.len() {
            if self.records[id].domain.is_some() {
                self.finish(DomainId::new(id))?;
            }
        }
        log::debug!(
            "calculated boundaries: {} candidate pairs, {} links over {} domains",
            pairs.len(),
            total,
            self.records.len()
        );
        crate::debug_invariants!(self.validate_invariants(), "calculate_boundaries");
        Ok(())
    }

    /// Broad phase over every declared domain lifted to the finest level,
    /// periodic images included.
    fn sweep_pairs(&self) -> Result<Vec<(usize, usize)>, MeshHaloError> {
        let domains: Vec<&Domain> = self.records.iter().filter_map(|r| r.domain.as_ref()).collect();
        let finest = domains.iter().map(|d| d.level).max().unwrap_or(0);
        let scale = self.levels.scale(finest)?;
        let steps: [Vec<i32>; 3] = std::array::from_fn(|axis| match self.config.periodic[axis] {
            Some(period) => vec![0, -period * scale[axis], period * scale[axis]],
            None => vec![0],
        });
        let images: Vec<[i32; 3]> = iproduct!(&steps[2], &steps[1], &steps[0])
            .map(|(&k, &j, &i)| [i, j, k])
            .collect();

        let mut entries = Vec::with_capacity(domains.len() * images.len());
        for d in domains {
            let ratio = masked_ratio(self.levels.cumulative(d.level, finest)?, d.flat());
            let lifted = d.extents.refine_points(ratio);
            entries.extend(images.iter().map(|&s| SweepEntry {
                owner: d.id.get(),
                bounds: lifted.translate(s),
            }));
        }
        Ok(candidate_pairs(&entries))
    }

    fn explicit_pairs(&self) -> Vec<(usize, usize)> {
        let mut set: FastSet<(usize, usize)> = FastSet::default();
        for (i, rec) in self.records.iter().enumerate() {
            if rec.domain.is_none() {
                continue;
            }
            if self.config.is_periodic() {
                set.insert((i, i));
            }
            for c in rec.candidates.iter().flatten() {
                let j = c.get();
                if j != i && self.records[j].domain.is_some() {
                    set.insert((i.min(j), i.max(j)));
                }
            }
        }
        set.into_iter().sorted_unstable().collect()
    }

    fn discover_pair(&self, i: usize, j: usize) -> Result<Vec<(usize, NeighborLink)>, MeshHaloError> {
        let (Some(a), Some(b)) = (&self.records[i].domain, &self.records[j].domain) else {
            return Ok(Vec::new());
        };
        let touches = compute_periodic_adjacencies(a, b, &self.levels, &self.config)?;
        let mut out = Vec::with_capacity(2 * touches.len());
        for (m, adj) in touches.iter().enumerate() {
            let (ab, ba) = link_pair(a, b, adj, m as u32, &self.levels, &self.config)?;
            out.push((i, ab));
            out.push((j, ba));
        }
        Ok(out)
    }

    /// Per face (`IMIN..KMAX`) whether a neighbor touches it, plus every
    /// distinct partner of the domain.
    pub fn get_neighbor_presence(
        &self,
        d: DomainId,
    ) -> Result<([bool; 6], Vec<DomainId>), MeshHaloError> {
        let rec = self.finished_record(d)?;
        let mut faces = [false; 6];
        if let Some(index) = &rec.face_index {
            for face in Face::ALL {
                faces[face.index()] = index.has_neighbor(face);
            }
        }
        let related = rec.links.iter().map(|l| l.partner).sorted().dedup().collect();
        Ok((faces, related))
    }

    /// Forget all links so the next step can rediscover them. Declared
    /// extents, levels and owners are kept.
    pub fn reset_cached_members(&mut self) {
        for rec in &mut self.records {
            rec.clear_links();
        }
    }

    pub fn neighbors(&self, d: DomainId) -> Result<&[NeighborLink], MeshHaloError> {
        Ok(&self.finished_record(d)?.links)
    }

    /// Face link of `d` whose shared region contains the global point `idx`.
    pub fn find_face_neighbor(
        &self,
        d: DomainId,
        face: Face,
        idx: [i32; 3],
    ) -> Result<Option<&NeighborLink>, MeshHaloError> {
        let rec = self.finished_record(d)?;
        Ok(rec
            .face_index
            .as_ref()
            .and_then(|index| index.find(&rec.links, face, idx))
            .map(|i| &rec.links[i]))
    }

    pub fn old_extents(&self, d: DomainId) -> Result<Option<IndexExtents>, MeshHaloError> {
        Ok(self.record(d)?.old_extents())
    }

    pub fn new_extents(&self, d: DomainId) -> Result<Option<IndexExtents>, MeshHaloError> {
        Ok(self.record(d)?.new_extents())
    }

    pub fn state(&self, d: DomainId) -> Result<DomainState, MeshHaloError> {
        Ok(self.record(d)?.state)
    }

    pub fn record_of(&self, d: DomainId) -> Result<&BoundaryRecord, MeshHaloError> {
        self.record(d)
    }

    /// Whether producing `kind` needs any data from other domains.
    pub fn requires_communication(&self, kind: GhostDataType) -> bool {
        let mut links = self.records.iter().flat_map(|r| r.links.iter());
        match kind {
            GhostDataType::DuplicateNodes => false,
            GhostDataType::GhostNodes | GhostDataType::GhostZones => {
                links.any(|l| l.relationship.receives())
            }
        }
    }
}

impl IndexTranslator for BoundaryRegistry {
    fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    fn levels(&self) -> &RefinementLevels {
        &self.levels
    }

    fn num_domains(&self) -> usize {
        self.records.len()
    }

    fn domain(&self, id: DomainId) -> Result<&Domain, MeshHaloError> {
        self.finished_record(id)?
            .domain
            .as_ref()
            .ok_or(MeshHaloError::MissingExtents(id))
    }

    fn links(&self, id: DomainId) -> Result<&[NeighborLink], MeshHaloError> {
        self.neighbors(id)
    }
}

impl DebugInvariants for BoundaryRegistry {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "BoundaryRegistry");
    }

    fn validate_invariants(&self) -> Result<(), MeshHaloError> {
        for (i, rec) in self.records.iter().enumerate() {
            if rec.state != DomainState::Finished {
                continue;
            }
            let d = DomainId::new(i);
            for link in &rec.links {
                let partner = self.record(link.partner)?;
                if !link.partner_points.contains_box(&link.overlap_points) {
                    return Err(MeshHaloError::InvalidConfig(format!(
                        "link {d} -> {} overlap {} leaves partner extents {}",
                        link.partner, link.overlap_points, link.partner_points
                    )));
                }
                if let Some(cells) = &link.overlap_cells {
                    if !link.partner_cells.contains_box(cells) {
                        return Err(MeshHaloError::InvalidConfig(format!(
                            "link {d} -> {} reaches cells {cells} outside the partner",
                            link.partner
                        )));
                    }
                }
                if partner.state != DomainState::Finished {
                    continue;
                }
                let mirrored = partner.links.iter().any(|back| {
                    back.partner == d
                        && back.match_index == link.match_index
                        && back.relationship == link.relationship.reverse()
                        && (link.refinement != RefinementRelationship::SameLevel
                            || back.transform == link.transform.inverse())
                });
                if !mirrored {
                    return Err(MeshHaloError::InvalidConfig(format!(
                        "link {d} -> {} (match {}) has no reverse link",
                        link.partner, link.match_index
                    )));
                }
            }
        }
        Ok(())
    }
}
