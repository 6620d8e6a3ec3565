//! Ghost-slot filling for every payload shape.
//!
//! One exchange call is collective over all workers. Each worker
//!
//! 1. validates the requested domains and the resident field shapes,
//! 2. packs donor records for every ghost plan that reads from a resident
//!    domain, recipients on other workers included,
//! 3. swaps the packed segments with its peers through a
//!    [`CollectiveExchange`],
//! 4. assembles ghost-augmented fields for the requested domains.
//!
//! Plans are derived from finished link data only, so the sender's packing
//! order and the receiver's scatter order agree without negotiation.
//! Seams whose donor data never arrives are filled with the element's
//! sentinel and logged; they never fail the call.

use crate::algs::exchange::collective::CollectiveExchange;
use crate::algs::exchange::payload::{DomainFields, ExchangeBuffer, FieldPayload, GhostField};
use crate::algs::wire::{
    KIND_MATERIAL, KIND_MESH, KIND_MIXVAR, KIND_SCALAR, KIND_VECTOR, decode_buffers,
    encode_buffers,
};
use crate::boundary::neighbor::NeighborLink;
use crate::boundary::translator::IndexTranslator;
use crate::config::VectorComponentPolicy;
use crate::data::coords::MeshCoords;
use crate::data::element::FieldElement;
use crate::data::ragged::{MaterialFraction, RaggedSection};
use crate::data::section::Section;
use crate::ghost::synthesizer::{GhostPlan, GhostSynthesizer, LinkPlan};
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::DomainId;
use crate::topology::extents::{Centering, flat_offset};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::marker::PhantomData;

#[derive(Copy, Clone, Debug)]
struct Request {
    kind: u16,
    centering: Centering,
    /// Rotate and reflect 3-vectors into the recipient's axes.
    reorient: bool,
    /// Reorder per-axis components into the recipient's axes, no reflection.
    permute: bool,
}

/// Exchanges field data of element type `T` across domain boundaries.
pub struct FieldExchanger<'a, T, X: ?Sized, C: ?Sized> {
    translator: &'a X,
    comm: &'a C,
    _elem: PhantomData<fn() -> T>,
}

fn by_ref<F>(fields: &DomainFields<F>) -> BTreeMap<DomainId, &F> {
    fields.iter().map(|(&d, f)| (d, f)).collect()
}

impl<'a, T, X, C> FieldExchanger<'a, T, X, C>
where
    T: FieldElement,
    X: IndexTranslator + ?Sized,
    C: CollectiveExchange + ?Sized,
{
    pub fn new(translator: &'a X, comm: &'a C) -> Self {
        Self {
            translator,
            comm,
            _elem: PhantomData,
        }
    }

    /// Ghost-augmented copies of one-value-per-entry fields.
    ///
    /// `fields` holds every field resident on this worker; the result holds
    /// one field per requested id, laid out over its ghost layout.
    pub fn exchange_scalar(
        &self,
        ids: &[DomainId],
        fields: &DomainFields<Section<T>>,
        centering: Centering,
    ) -> Result<DomainFields<Section<T>>, MeshHaloError> {
        let req = Request {
            kind: KIND_SCALAR,
            centering,
            reorient: false,
            permute: false,
        };
        self.run(ids, &by_ref(fields), req)
    }

    /// Like [`exchange_scalar`](Self::exchange_scalar) for multi-component
    /// fields. Components are rotated into the recipient's axes only under
    /// [`VectorComponentPolicy::FollowOrientation`].
    pub fn exchange_vector(
        &self,
        ids: &[DomainId],
        fields: &DomainFields<Section<T>>,
        centering: Centering,
    ) -> Result<DomainFields<Section<T>>, MeshHaloError> {
        let req = Request {
            kind: KIND_VECTOR,
            centering,
            reorient: self.translator.config().vector_components
                == VectorComponentPolicy::FollowOrientation,
            permute: false,
        };
        self.run(ids, &by_ref(fields), req)
    }

    /// Zone material chains; ghost zones without donor get an empty chain.
    pub fn exchange_material(
        &self,
        ids: &[DomainId],
        fields: &DomainFields<RaggedSection<MaterialFraction>>,
    ) -> Result<DomainFields<RaggedSection<MaterialFraction>>, MeshHaloError> {
        let req = Request {
            kind: KIND_MATERIAL,
            centering: Centering::Cell,
            reorient: false,
            permute: false,
        };
        self.run(ids, &by_ref(fields), req)
    }

    /// Per-zone mixed-material variables, chain order preserved.
    pub fn exchange_mixvar(
        &self,
        ids: &[DomainId],
        fields: &DomainFields<RaggedSection<T>>,
    ) -> Result<DomainFields<RaggedSection<T>>, MeshHaloError> {
        let req = Request {
            kind: KIND_MIXVAR,
            centering: Centering::Cell,
            reorient: false,
            permute: false,
        };
        self.run(ids, &by_ref(fields), req)
    }

    /// Node coordinates, extended over the ghost nodes.
    ///
    /// Coordinates are positions, not directions, so they are never
    /// reflected. Rectilinear axis values are reordered into the recipient's
    /// axes; curvilinear triples travel untouched. Periodic images receive
    /// the donor's coordinates verbatim.
    pub fn exchange_mesh(
        &self,
        ids: &[DomainId],
        coords: &DomainFields<MeshCoords<T>>,
    ) -> Result<DomainFields<MeshCoords<T>>, MeshHaloError> {
        let points: DomainFields<Section<T>> =
            coords.iter().map(|(&d, c)| (d, c.to_points())).collect();
        let rectilinear = !coords.is_empty()
            && coords
                .values()
                .all(|c| matches!(c, MeshCoords::Rectilinear { .. }));
        let req = Request {
            kind: KIND_MESH,
            centering: Centering::Point,
            reorient: false,
            permute: rectilinear,
        };
        self.run(ids, &by_ref(&points), req)?
            .into_iter()
            .map(|(d, p)| {
                let like = coords.get(&d).ok_or(MeshHaloError::MissingField(d))?;
                Ok((d, MeshCoords::from_points(like, p)?))
            })
            .collect()
    }

    /// Dispatch on the payload shape. Every payload must have the same shape.
    pub fn exchange(
        &self,
        ids: &[DomainId],
        fields: &DomainFields<FieldPayload<T>>,
        centering: Centering,
    ) -> Result<DomainFields<FieldPayload<T>>, MeshHaloError> {
        let Some(first) = fields.values().next() else {
            return match ids.first() {
                Some(&d) => Err(MeshHaloError::MissingField(d)),
                None => Ok(BTreeMap::new()),
            };
        };
        if let Some(other) = fields
            .values()
            .find(|p| std::mem::discriminant(*p) != std::mem::discriminant(first))
        {
            return Err(MeshHaloError::MixedPayloadKinds(format!(
                "{} and {}",
                first.kind_name(),
                other.kind_name()
            )));
        }

        macro_rules! dispatch {
            ($variant:ident, $inner:ident => $call:expr) => {{
                let $inner: DomainFields<_> = fields
                    .iter()
                    .filter_map(|(&d, p)| match p {
                        FieldPayload::$variant(f) => Some((d, f.clone())),
                        _ => None,
                    })
                    .collect();
                Ok($call?
                    .into_iter()
                    .map(|(d, f)| (d, FieldPayload::$variant(f)))
                    .collect())
            }};
        }

        match first {
            FieldPayload::Scalar(_) => {
                dispatch!(Scalar, inner => self.exchange_scalar(ids, &inner, centering))
            }
            FieldPayload::Vector(_) => {
                dispatch!(Vector, inner => self.exchange_vector(ids, &inner, centering))
            }
            FieldPayload::Material(_) => {
                dispatch!(Material, inner => self.exchange_material(ids, &inner))
            }
            FieldPayload::MixVar(_) => dispatch!(MixVar, inner => self.exchange_mixvar(ids, &inner)),
        }
    }

    fn validate<F: GhostField>(
        &self,
        ids: &BTreeSet<DomainId>,
        fields: &BTreeMap<DomainId, &F>,
        centering: Centering,
    ) -> Result<(), MeshHaloError> {
        for &d in ids {
            self.translator.domain(d)?;
            if !fields.contains_key(&d) {
                return Err(MeshHaloError::MissingField(d));
            }
        }
        for (&d, f) in fields {
            let expected = self.translator.domain(d)?.local_dims(centering);
            if f.dims() != expected {
                return Err(MeshHaloError::FieldShapeMismatch {
                    domain: d,
                    expected,
                    found: f.dims(),
                });
            }
        }
        Ok(())
    }

    /// Donor records across one link, in plan order.
    fn pack<F: GhostField>(
        &self,
        recipient: DomainId,
        lp: &LinkPlan,
        link: &NeighborLink,
        donor: &F,
        req: Request,
    ) -> Result<ExchangeBuffer<F::Item>, MeshHaloError> {
        let dims = donor.dims();
        let rotate = (req.reorient || req.permute) && !link.orientation.is_identity();
        let mut buf = ExchangeBuffer::new(recipient, lp.link, donor.width());
        let mut scratch = Vec::new();
        for src in &lp.sources {
            let rec = donor.record(flat_offset(dims, src.donor_index.map(|v| v as usize)))?;
            if rotate {
                scratch.clear();
                scratch.extend_from_slice(rec);
                if req.reorient {
                    F::reorient(&mut scratch, &link.orientation);
                } else {
                    F::permute(&mut scratch, &link.orientation);
                }
                buf.push(&scratch);
            } else {
                buf.push(rec);
            }
        }
        Ok(buf)
    }

    /// Pack every link of `plan` whose donor is resident.
    fn pack_plan<F: GhostField>(
        &self,
        plan: &GhostPlan,
        fields: &BTreeMap<DomainId, &F>,
        req: Request,
    ) -> Result<Vec<ExchangeBuffer<F::Item>>, MeshHaloError> {
        let links = self.translator.links(plan.domain)?;
        let mut out = Vec::new();
        for lp in &plan.links {
            if let Some(donor) = fields.get(&lp.partner) {
                out.push(self.pack(plan.domain, lp, &links[lp.link], *donor, req)?);
            }
        }
        Ok(out)
    }

    /// Workers owning a domain linked to one of ours. Symmetric across workers
    /// because links are.
    fn peers(&self, rank: usize) -> Result<BTreeSet<usize>, MeshHaloError> {
        let mut peers = BTreeSet::new();
        for d in self.translator.finished_domains() {
            if self.translator.domain(d)?.owner != rank {
                continue;
            }
            for l in self.translator.links(d)? {
                let owner = self.translator.domain(l.partner)?.owner;
                if owner != rank {
                    peers.insert(owner);
                }
            }
        }
        Ok(peers)
    }

    fn run<F: GhostField>(
        &self,
        ids: &[DomainId],
        fields: &BTreeMap<DomainId, &F>,
        req: Request,
    ) -> Result<DomainFields<F>, MeshHaloError> {
        let tr = self.translator;
        let syn = GhostSynthesizer::new(tr);
        let rank = self.comm.rank();
        let ids: BTreeSet<DomainId> = ids.iter().copied().collect();
        self.validate(&ids, fields, req.centering)?;

        // recipients elsewhere that read from a domain resident here
        let mut remote_recipients = BTreeSet::new();
        for &d in fields.keys() {
            for l in tr.links(d)? {
                if !fields.contains_key(&l.partner) && tr.domain(l.partner)?.owner != rank {
                    remote_recipients.insert(l.partner);
                }
            }
        }
        let mut outgoing: BTreeMap<usize, Vec<ExchangeBuffer<F::Item>>> = BTreeMap::new();
        for r in remote_recipients {
            let owner = tr.domain(r)?.owner;
            let plan = syn.ghost_plan(r, req.centering)?;
            let bufs = self.pack_plan(&plan, fields, req)?;
            outgoing.entry(owner).or_default().extend(bufs);
        }

        let mut segments: HashMap<(DomainId, usize), ExchangeBuffer<F::Item>> = HashMap::new();
        let mut plans = Vec::with_capacity(ids.len());
        for &d in &ids {
            let plan = syn.ghost_plan(d, req.centering)?;
            for b in self.pack_plan(&plan, fields, req)? {
                segments.insert((b.recipient, b.link), b);
            }
            plans.push(plan);
        }
        let n_local = segments.len();

        let peers = self.peers(rank)?;
        for (w, bufs) in outgoing.iter().filter(|(w, _)| !peers.contains(*w)) {
            log::debug!("dropping {} segments for worker {w}: not a peer", bufs.len());
        }
        let n_sent: usize = outgoing.values().map(Vec::len).sum();
        let messages = peers
            .iter()
            .map(|&p| {
                let bufs = outgoing.get(&p).map_or(&[][..], Vec::as_slice);
                (p, encode_buffers(req.kind, bufs))
            })
            .collect();
        for (p, bytes) in self.comm.exchange(messages, &peers)? {
            match decode_buffers::<F::Item>(req.kind, &bytes) {
                Ok(bufs) => {
                    for b in bufs.into_iter().filter(|b| ids.contains(&b.recipient)) {
                        segments.entry((b.recipient, b.link)).or_insert(b);
                    }
                }
                Err(e) => log::warn!("discarding payload from worker {p}: {e}"),
            }
        }

        let mut missing_seams = 0usize;
        let mut out = BTreeMap::new();
        for plan in &plans {
            let d = plan.domain;
            let field = *fields.get(&d).ok_or(MeshHaloError::MissingField(d))?;
            let layout = &plan.layout;
            let missing = field.missing_record();

            let mut slots: Vec<Option<&[F::Item]>> = vec![None; layout.len()];
            for (s, slot) in slots.iter_mut().enumerate() {
                if let Some(off) = layout.real_offset(layout.local_of(s)) {
                    *slot = Some(field.record(off)?);
                }
            }
            for lp in &plan.links {
                let seg = segments
                    .get(&(d, lp.link))
                    .filter(|b| b.slots == lp.sources.len() && b.is_consistent());
                match seg {
                    Some(b) => {
                        for (src, rec) in lp.sources.iter().zip(b.records()) {
                            slots[src.slot] = Some(rec);
                        }
                    }
                    None => {
                        missing_seams += 1;
                        log::debug!(
                            "{}",
                            MeshHaloError::MissingNeighborData {
                                domain: d,
                                partner: lp.partner,
                            }
                        );
                    }
                }
            }

            let records = slots.iter().map(|s| s.unwrap_or(missing.as_slice()));
            out.insert(d, F::rebuild(field, layout.expanded_dims(), records)?);
        }

        log::debug!(
            "exchange kind {} on worker {rank}: {} domains, {n_local} local segments, \
             {n_sent} segments to {} peers, {missing_seams} missing seams",
            req.kind,
            out.len(),
            peers.len()
        );
        Ok(out)
    }
}
