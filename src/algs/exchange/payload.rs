//! Payload shapes carried by a halo exchange.
//!
//! All shapes go through one generic engine: anything that can hand out a
//! record per entry and be rebuilt from records in flat order is a
//! [`GhostField`].

use crate::data::element::FieldElement;
use crate::data::ragged::{MaterialFraction, RaggedSection};
use crate::data::section::{FieldAccess, Section};
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::DomainId;
use crate::topology::orientation::AxisTransform;
use bytemuck::Pod;
use std::collections::BTreeMap;

/// Field data keyed by domain.
pub type DomainFields<F> = BTreeMap<DomainId, F>;

/// Per-entry field storage the exchanger can read and rebuild.
pub trait GhostField: Sized {
    type Item: Pod + Send + Sync;

    /// Entries per local axis.
    fn dims(&self) -> [usize; 3];

    /// Values per entry, or `None` for variable-length chains.
    fn width(&self) -> Option<usize>;

    fn record(&self, i: usize) -> Result<&[Self::Item], MeshHaloError>;

    /// Record written into ghost slots whose donor data is unavailable.
    fn missing_record(&self) -> Vec<Self::Item>;

    /// A field shaped like `like`, with `dims` entries taken from `records`
    /// in flat order.
    fn rebuild<'r, I>(like: &Self, dims: [usize; 3], records: I) -> Result<Self, MeshHaloError>
    where
        I: IntoIterator<Item = &'r [Self::Item]>,
        Self::Item: 'r;

    /// Rotate a donor record into the recipient's axes.
    fn reorient(_record: &mut [Self::Item], _orientation: &AxisTransform) {}

    /// Reorder per-axis components of a donor record into the recipient's
    /// axes without changing their values.
    fn permute(_record: &mut [Self::Item], _orientation: &AxisTransform) {}
}

impl<T: FieldElement> GhostField for Section<T> {
    type Item = T;

    fn dims(&self) -> [usize; 3] {
        FieldAccess::dims(self)
    }

    fn width(&self) -> Option<usize> {
        Some(self.components())
    }

    fn record(&self, i: usize) -> Result<&[T], MeshHaloError> {
        self.try_restrict(i)
    }

    fn missing_record(&self) -> Vec<T> {
        vec![T::nonexistent(); self.components()]
    }

    fn rebuild<'r, I>(like: &Self, dims: [usize; 3], records: I) -> Result<Self, MeshHaloError>
    where
        I: IntoIterator<Item = &'r [T]>,
        T: 'r,
    {
        let data: Vec<T> = records.into_iter().flatten().copied().collect();
        Section::from_vec(dims, like.components(), data)
    }

    /// Component `a` of the result is component `perm[a]` of the donor,
    /// negated where the axis is reversed. Only 3-vectors are touched.
    fn reorient(record: &mut [T], orientation: &AxisTransform) {
        let Ok(v) = <[T; 3]>::try_from(&*record) else {
            return;
        };
        let g = orientation.gather(v);
        for (a, out) in record.iter_mut().enumerate() {
            *out = if orientation.flip[a] { g[a].reflect() } else { g[a] };
        }
    }

    fn permute(record: &mut [T], orientation: &AxisTransform) {
        if let Ok(v) = <[T; 3]>::try_from(&*record) {
            record.copy_from_slice(&orientation.gather(v));
        }
    }
}

impl<R: Pod + Send + Sync> GhostField for RaggedSection<R> {
    type Item = R;

    fn dims(&self) -> [usize; 3] {
        RaggedSection::dims(self)
    }

    fn width(&self) -> Option<usize> {
        None
    }

    fn record(&self, i: usize) -> Result<&[R], MeshHaloError> {
        self.chain(i)
    }

    fn missing_record(&self) -> Vec<R> {
        Vec::new()
    }

    fn rebuild<'r, I>(_like: &Self, dims: [usize; 3], records: I) -> Result<Self, MeshHaloError>
    where
        I: IntoIterator<Item = &'r [R]>,
        R: 'r,
    {
        RaggedSection::from_chains(dims, records)
    }
}

/// Tagged union over every payload shape, for callers that dispatch on data
/// at run time.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldPayload<T> {
    Scalar(Section<T>),
    Vector(Section<T>),
    Material(RaggedSection<MaterialFraction>),
    MixVar(RaggedSection<T>),
}

impl<T> FieldPayload<T> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldPayload::Scalar(_) => "scalar",
            FieldPayload::Vector(_) => "vector",
            FieldPayload::Material(_) => "material",
            FieldPayload::MixVar(_) => "mixvar",
        }
    }
}

/// Donor records for the ghost slots one link fills, in plan order.
#[derive(Clone, Debug, PartialEq)]
pub struct ExchangeBuffer<E> {
    pub recipient: DomainId,
    /// Index of the link in the recipient's table.
    pub link: usize,
    pub slots: usize,
    /// Values per slot; 0 for ragged records described by `counts`.
    pub width: usize,
    pub counts: Vec<u32>,
    pub values: Vec<E>,
}

impl<E: Pod> ExchangeBuffer<E> {
    pub fn new(recipient: DomainId, link: usize, width: Option<usize>) -> Self {
        Self {
            recipient,
            link,
            slots: 0,
            width: width.unwrap_or(0),
            counts: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, record: &[E]) {
        if self.width == 0 {
            self.counts.push(record.len() as u32);
        }
        self.values.extend_from_slice(record);
        self.slots += 1;
    }

    /// Whether counts, width and values agree.
    pub fn is_consistent(&self) -> bool {
        if self.width == 0 {
            self.counts.len() == self.slots
                && self.counts.iter().map(|&c| c as usize).sum::<usize>() == self.values.len()
        } else {
            self.counts.is_empty() && self.values.len() == self.slots * self.width
        }
    }

    /// Records in slot order.
    pub fn records(&self) -> Vec<&[E]> {
        if self.width > 0 {
            return self.values.chunks_exact(self.width).collect();
        }
        let mut at = 0;
        self.counts
            .iter()
            .map(|&c| {
                let r = &self.values[at..at + c as usize];
                at += c as usize;
                r
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_buffer_tracks_counts() {
        let mut b = ExchangeBuffer::<f64>::new(DomainId::new(1), 0, None);
        b.push(&[1.0, 2.0]);
        b.push(&[]);
        b.push(&[3.0]);
        assert!(b.is_consistent());
        assert_eq!(b.records(), vec![&[1.0, 2.0][..], &[][..], &[3.0][..]]);
    }

    #[test]
    fn fixed_buffer_rejects_short_values() {
        let mut b = ExchangeBuffer::<i32>::new(DomainId::new(0), 2, Some(3));
        b.push(&[1, 2, 3]);
        assert!(b.is_consistent());
        b.values.pop();
        assert!(!b.is_consistent());
    }

    #[test]
    fn reorient_swaps_and_reverses_components() {
        // recipient axis 0 runs along donor axis 1 reversed; axis 1 along donor axis 0
        let o = AxisTransform::from_signed([-2, 1, 3]).unwrap();
        let mut v = [1.0f64, 2.0, 3.0];
        Section::<f64>::reorient(&mut v, &o);
        assert_eq!(v, [-2.0, 1.0, 3.0]);

        let mut scalar = [5.0f64];
        Section::<f64>::reorient(&mut scalar, &o);
        assert_eq!(scalar, [5.0]);
    }

    #[test]
    fn permute_reorders_without_reflecting() {
        let o = AxisTransform::from_signed([-2, 1, 3]).unwrap();
        let mut v = [1.0f64, 2.0, 3.0];
        Section::<f64>::permute(&mut v, &o);
        assert_eq!(v, [2.0, 1.0, 3.0]);
    }

    #[test]
    fn rebuild_checks_record_count() {
        let like = Section::<u8>::new([2, 1, 1], 1);
        let recs: Vec<&[u8]> = vec![&[1], &[2], &[3]];
        assert!(Section::rebuild(&like, [2, 1, 1], recs.clone()).is_err());
        let s = Section::rebuild(&like, [3, 1, 1], recs).unwrap();
        assert_eq!(s.as_slice(), &[1, 2, 3]);
    }
}
