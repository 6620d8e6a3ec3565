//! Ghost envelopes, index remapping and ghost flags.
//!
//! Everything here is derived from finished link data only, so sender and
//! receiver of an exchange compute identical plans without talking to each
//! other.

use crate::boundary::neighbor::NeighborLink;
use crate::boundary::translator::IndexTranslator;
use crate::geometry::adjacency::Contact;
use crate::ghost::envelope::{GhostEnvelope, GhostLayout};
use crate::ghost::flags::{GhostFlags, GhostKind};
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::{Domain, DomainId};
use crate::topology::extents::{Centering, Face};
use crate::topology::refinement::RefinementRelationship;
use itertools::Itertools;
use std::collections::BTreeMap;

/// One ghost slot and the donor index that fills it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GhostSource {
    /// Slot in the recipient's ghost-augmented layout.
    pub slot: usize,
    /// Real local index in the donor domain.
    pub donor_index: [i32; 3],
}

/// Slots filled across one link, ascending by slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPlan {
    pub link: usize,
    pub partner: DomainId,
    pub sources: Vec<GhostSource>,
}

/// Where every ghost slot of a domain takes its value from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GhostPlan {
    pub domain: DomainId,
    pub layout: GhostLayout,
    /// Links that fill at least one slot, ascending by link index.
    pub links: Vec<LinkPlan>,
    /// Ghost slots inside the envelope that no link covers.
    pub orphans: Vec<usize>,
}

impl GhostPlan {
    pub fn ghost_count(&self) -> usize {
        self.links.iter().map(|l| l.sources.len()).sum::<usize>() + self.orphans.len()
    }
}

pub struct GhostSynthesizer<'a, X: IndexTranslator + ?Sized> {
    translator: &'a X,
}

impl<'a, X: IndexTranslator + ?Sized> GhostSynthesizer<'a, X> {
    pub fn new(translator: &'a X) -> Self {
        Self { translator }
    }

    /// Per side, the deepest reach of any contributing link beyond the
    /// domain's real cells.
    ///
    /// Face links widen only their own face; a nested coarse parent widens
    /// every side of the finer patch it encloses. Edge and corner links never
    /// widen the envelope.
    pub fn compute_ghost_envelope(&self, d: DomainId) -> Result<GhostEnvelope, MeshHaloError> {
        let dom = self.translator.domain(d)?;
        let links = self.translator.links(d)?;
        let config = self.translator.config();
        let real = dom.cell_extents();
        let flat = dom.flat();

        let mut env = GhostEnvelope::empty(dom);
        for link in links {
            let Some(cells) = link.overlap_cells else {
                continue;
            };
            if !link.donates_to_owner(config) {
                continue;
            }
            match link.contact {
                Contact::Face(face) => {
                    let ax = face.axis();
                    let reach = if face.is_upper() {
                        cells.hi[ax] - real.hi[ax]
                    } else {
                        real.lo[ax] - cells.lo[ax]
                    };
                    env.widen(face, reach);
                }
                Contact::Nested if link.refinement == RefinementRelationship::Finer => {
                    for ax in (0..3).filter(|&ax| !flat[ax]) {
                        env.widen(Face::new(ax, false), real.lo[ax] - cells.lo[ax]);
                        env.widen(Face::new(ax, true), cells.hi[ax] - real.hi[ax]);
                    }
                }
                _ => {}
            }
        }
        Ok(env)
    }

    pub fn layout(&self, d: DomainId, centering: Centering) -> Result<GhostLayout, MeshHaloError> {
        let env = self.compute_ghost_envelope(d)?;
        Ok(GhostLayout::from_envelope(&env, self.translator.domain(d)?, centering))
    }

    /// Translate a local index of `d` into the local frame of the partner
    /// across link `link`.
    ///
    /// Composes the local-to-global frame, the link transform, the
    /// refinement scaling and the partner's global-to-local frame. Fails with
    /// `NonIntegerTranslation` when a point falls between partner points and
    /// with `TranslationOutOfBounds` when the image is not a real partner index.
    pub fn remap_index(
        &self,
        d: DomainId,
        link: usize,
        local: [i32; 3],
        centering: Centering,
    ) -> Result<[i32; 3], MeshHaloError> {
        let dom = self.translator.domain(d)?;
        let l = self
            .translator
            .links(d)?
            .get(link)
            .ok_or(MeshHaloError::UnknownLink { domain: d, link })?;
        let partner = self.translator.domain(l.partner)?;
        remap(dom, l, partner, local, centering)
    }

    /// Donor of every ghost slot of `d`.
    ///
    /// Links are applied coarsest partner first so that where donors overlap
    /// the finest one wins. A ghost node facing a coarser partner is filled
    /// only where it lands on a coarse node; the nodes in between stay
    /// orphans.
    pub fn ghost_plan(&self, d: DomainId, centering: Centering) -> Result<GhostPlan, MeshHaloError> {
        let dom = self.translator.domain(d)?;
        let links = self.translator.links(d)?;
        let config = self.translator.config();
        let env = self.compute_ghost_envelope(d)?;
        let layout = GhostLayout::from_envelope(&env, dom, centering);
        let real = env.real(centering);
        let expanded = env.expanded(centering);

        let order = links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.donates_to_owner(config))
            .sorted_by_key(|(i, l)| (l.partner_level, *i))
            .map(|(i, _)| i);

        let mut owner: Vec<Option<usize>> = vec![None; layout.len()];
        for li in order {
            let link = &links[li];
            let region = match centering {
                Centering::Cell => link.overlap_cells,
                Centering::Point => Some(link.partner_points),
            };
            let Some(region) = region.and_then(|r| r.intersect(&expanded)) else {
                continue;
            };
            let lattice_only =
                centering == Centering::Point && link.refinement == RefinementRelationship::Finer;
            for g in region.iter().filter(|g| !real.contains(*g)) {
                if lattice_only && link.translate(d, g, centering, dom.flat()).is_err() {
                    continue;
                }
                if let Some(s) = layout.slot(dom.to_local(g, centering)) {
                    owner[s] = Some(li);
                }
            }
        }

        let mut per_link: BTreeMap<usize, Vec<GhostSource>> = BTreeMap::new();
        let mut orphans = Vec::new();
        for (slot, who) in owner.into_iter().enumerate() {
            let local = layout.local_of(slot);
            if layout.is_real(local) {
                continue;
            }
            match who {
                Some(li) => {
                    let link = &links[li];
                    let partner = self.translator.domain(link.partner)?;
                    let donor_index = remap(dom, link, partner, local, centering)?;
                    per_link
                        .entry(li)
                        .or_default()
                        .push(GhostSource { slot, donor_index });
                }
                None => orphans.push(slot),
            }
        }

        Ok(GhostPlan {
            domain: d,
            layout,
            links: per_link
                .into_iter()
                .map(|(link, sources)| LinkPlan {
                    link,
                    partner: links[link].partner,
                    sources,
                })
                .collect(),
            orphans,
        })
    }

    /// Ghost-augmented zone flags for each requested domain.
    pub fn create_ghost_zones(
        &self,
        ids: &[DomainId],
    ) -> Result<BTreeMap<DomainId, GhostFlags>, MeshHaloError> {
        let mut out = BTreeMap::new();
        for &d in ids {
            let plan = self.ghost_plan(d, Centering::Cell)?;
            let mut flags = ghost_marked(&plan.layout);
            let dom = self.translator.domain(d)?;
            for link in self.translator.links(d)? {
                let enclosing = link.contact == Contact::Nested
                    && link.refinement == RefinementRelationship::Coarser;
                let Some(cells) = link.overlap_cells.filter(|_| enclosing) else {
                    continue;
                };
                for g in cells.iter() {
                    if let Some(s) = plan.layout.slot(dom.to_local(g, Centering::Cell)) {
                        flags[s] = GhostKind::GhostEnclosedByFinerPatch;
                    }
                }
            }
            out.insert(
                d,
                GhostFlags {
                    layout: plan.layout,
                    flags,
                },
            );
        }
        Ok(out)
    }

    /// Ghost-augmented node flags, duplicated shared nodes included.
    pub fn create_ghost_nodes(
        &self,
        ids: &[DomainId],
    ) -> Result<BTreeMap<DomainId, GhostFlags>, MeshHaloError> {
        let mut out = BTreeMap::new();
        for &d in ids {
            let layout = self.layout(d, Centering::Point)?;
            let mut flags = ghost_marked(&layout);
            self.mark_duplicates(d, &layout, &mut flags)?;
            out.insert(d, GhostFlags { layout, flags });
        }
        Ok(out)
    }

    /// Node flags over the real nodes only: shared nodes a lower domain (or
    /// lower periodic image) already owns are tagged as duplicates.
    pub fn flag_duplicate_nodes(
        &self,
        ids: &[DomainId],
    ) -> Result<BTreeMap<DomainId, GhostFlags>, MeshHaloError> {
        let mut out = BTreeMap::new();
        for &d in ids {
            let layout = GhostLayout::real_only(self.translator.domain(d)?, Centering::Point);
            let mut flags = vec![GhostKind::Real; layout.len()];
            self.mark_duplicates(d, &layout, &mut flags)?;
            out.insert(d, GhostFlags { layout, flags });
        }
        Ok(out)
    }

    fn mark_duplicates(
        &self,
        d: DomainId,
        layout: &GhostLayout,
        flags: &mut [GhostKind],
    ) -> Result<(), MeshHaloError> {
        let dom = self.translator.domain(d)?;
        for link in self.translator.links(d)? {
            if link.refinement != RefinementRelationship::SameLevel || link.contact == Contact::Nested {
                continue;
            }
            let self_image = link.partner == d;
            if !self_image && link.partner > d {
                continue;
            }
            for g in link.overlap_points.iter() {
                if self_image && link.transform.apply_point(g) > g {
                    continue;
                }
                let local = dom.to_local(g, Centering::Point);
                if let Some(s) = layout.slot(local).filter(|_| layout.is_real(local)) {
                    flags[s] = GhostKind::GhostDuplicateWithinDomain;
                }
            }
        }
        Ok(())
    }
}

fn ghost_marked(layout: &GhostLayout) -> Vec<GhostKind> {
    (0..layout.len())
        .map(|s| {
            if layout.is_real(layout.local_of(s)) {
                GhostKind::Real
            } else {
                GhostKind::GhostFromNeighbor
            }
        })
        .collect()
}

fn remap(
    dom: &Domain,
    link: &NeighborLink,
    partner: &Domain,
    local: [i32; 3],
    centering: Centering,
) -> Result<[i32; 3], MeshHaloError> {
    let global = dom.to_global(local, centering);
    let image = link.translate(dom.id, global, centering, dom.flat())?;
    if !partner.real_extents(centering).contains(image) {
        return Err(MeshHaloError::TranslationOutOfBounds {
            domain: dom.id,
            partner: partner.id,
            index: local,
        });
    }
    Ok(partner.to_local(image, centering))
}
