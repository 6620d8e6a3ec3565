//! Fixed, versioned wire records for halo exchange.
//!
//! A message to one peer is
//!
//! ```text
//! WireHdr | WireCount(n) | n × ( WireSegmentHdr | [u32; slots] if ragged | values )
//! ```
//!
//! Each segment carries the donor records of one link, in the recipient's
//! plan order. The header's `reserved` word carries the element size so a
//! receiver never reinterprets values of a different type.
//!
//! Headers and ragged counts are little-endian. Field values are copied bit
//! for bit in the sender's native byte order, so all workers of one run must
//! share an endianness.

use crate::algs::exchange::payload::ExchangeBuffer;
use crate::mesh_error::MeshHaloError;
use crate::topology::domain::DomainId;
use bytemuck::{Pod, Zeroable};
use bytes::{BufMut, Bytes, BytesMut};
use std::mem::size_of;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

pub const KIND_SCALAR: u16 = 1;
pub const KIND_VECTOR: u16 = 2;
pub const KIND_MATERIAL: u16 = 3;
pub const KIND_MIXVAR: u16 = 4;
pub const KIND_MESH: u16 = 5;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

// All multi-byte integers in these structs are little-endian on the wire:
// stored with `.to_le()`, read back with `from_le`.

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,  // = WIRE_VERSION.to_le()
    pub kind_le: u16,     // KIND_*
    pub reserved_le: u32, // element size in bytes
}

impl WireHdr {
    pub fn new(kind: u16, elem_size: usize) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            reserved_le: (elem_size as u32).to_le(),
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn elem_size(&self) -> usize {
        u32::from_le(self.reserved_le) as usize
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32, // count of following records
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// Header of one link's segment.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireSegmentHdr {
    pub recipient_le: u32,
    pub link_le: u32,
    pub slots_le: u32,
    /// Values per slot; 0 means ragged, with per-slot counts following.
    pub width_le: u32,
}

impl WireSegmentHdr {
    pub fn new(recipient: usize, link: usize, slots: usize, width: usize) -> Self {
        Self {
            recipient_le: (recipient as u32).to_le(),
            link_le: (link as u32).to_le(),
            slots_le: (slots as u32).to_le(),
            width_le: (width as u32).to_le(),
        }
    }
    pub fn decode(&self) -> (usize, usize, usize, usize) {
        (
            u32::from_le(self.recipient_le) as usize,
            u32::from_le(self.link_le) as usize,
            u32::from_le(self.slots_le) as usize,
            u32::from_le(self.width_le) as usize,
        )
    }
}

/// Prefix of every point-to-point message: the sender's exchange epoch and
/// the length of what follows (stage one) or of the payload (stage two).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireStamp {
    pub epoch_le: u32,
    pub len_le: u32,
}

impl WireStamp {
    pub fn new(epoch: u32, len: usize) -> Self {
        Self {
            epoch_le: epoch.to_le(),
            len_le: (len as u32).to_le(),
        }
    }
    pub fn epoch(&self) -> u32 {
        u32::from_le(self.epoch_le)
    }
    pub fn body_len(&self) -> usize {
        u32::from_le(self.len_le) as usize
    }

    /// Split a received message into its stamp and body.
    pub fn split(msg: &[u8]) -> Result<(Self, &[u8]), MeshHaloError> {
        if msg.len() < size_of::<Self>() {
            return Err(MeshHaloError::WireFormat(format!(
                "message of {} bytes has no stamp",
                msg.len()
            )));
        }
        let (head, body) = msg.split_at(size_of::<Self>());
        Ok((bytemuck::pod_read_unaligned(head), body))
    }

    /// `stamp | body` as one message.
    pub fn prepend(self, body: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(size_of::<Self>() + body.len());
        out.put_slice(bytemuck::bytes_of(&self));
        out.put_slice(body);
        out.freeze()
    }
}

static_assertions::const_assert_eq!(size_of::<WireHdr>(), 8);
static_assertions::const_assert_eq!(size_of::<WireStamp>(), 8);
static_assertions::const_assert_eq!(size_of::<WireCount>(), 4);
static_assertions::const_assert_eq!(size_of::<WireSegmentHdr>(), 16);

/// Serialize every buffer bound for one peer.
pub fn encode_buffers<E: Pod>(kind: u16, bufs: &[ExchangeBuffer<E>]) -> Bytes {
    let body: usize = bufs
        .iter()
        .map(|b| size_of::<WireSegmentHdr>() + 4 * b.counts.len() + size_of::<E>() * b.values.len())
        .sum();
    let mut out = BytesMut::with_capacity(size_of::<WireHdr>() + size_of::<WireCount>() + body);
    out.put_slice(bytemuck::bytes_of(&WireHdr::new(kind, size_of::<E>())));
    out.put_slice(bytemuck::bytes_of(&WireCount::new(bufs.len())));
    for b in bufs {
        let hdr = WireSegmentHdr::new(b.recipient.get(), b.link, b.slots, b.width);
        out.put_slice(bytemuck::bytes_of(&hdr));
        for &c in &b.counts {
            out.put_u32_le(c);
        }
        out.put_slice(cast_slice(&b.values));
    }
    out.freeze()
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MeshHaloError> {
        if self.buf.len() < n {
            return Err(MeshHaloError::WireFormat(format!(
                "truncated message: need {n} bytes, {} left",
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn record<R: Pod>(&mut self) -> Result<R, MeshHaloError> {
        Ok(bytemuck::pod_read_unaligned(self.take(size_of::<R>())?))
    }

    /// Copy `n` records into an owned, aligned vector.
    fn records<R: Pod>(&mut self, n: usize) -> Result<Vec<R>, MeshHaloError> {
        let len = n.checked_mul(size_of::<R>()).ok_or_else(|| {
            MeshHaloError::WireFormat(format!("record count {n} overflows"))
        })?;
        let bytes = self.take(len)?;
        let mut out = vec![R::zeroed(); n];
        cast_slice_mut(&mut out).copy_from_slice(bytes);
        Ok(out)
    }
}

/// Inverse of [`encode_buffers`].
///
/// # Errors
/// `WireFormat` on a version, kind or element-size mismatch, a truncated
/// message, trailing bytes, or a segment whose counts disagree with its
/// value array.
pub fn decode_buffers<E: Pod>(kind: u16, bytes: &[u8]) -> Result<Vec<ExchangeBuffer<E>>, MeshHaloError> {
    let mut r = Reader { buf: bytes };
    let hdr: WireHdr = r.record()?;
    if hdr.version() != WIRE_VERSION {
        return Err(MeshHaloError::WireFormat(format!(
            "wire version {} (expected {WIRE_VERSION})",
            hdr.version()
        )));
    }
    if hdr.kind() != kind || hdr.elem_size() != size_of::<E>() {
        return Err(MeshHaloError::WireFormat(format!(
            "payload kind {}/{} bytes, expected {kind}/{} bytes",
            hdr.kind(),
            hdr.elem_size(),
            size_of::<E>()
        )));
    }
    let n = r.record::<WireCount>()?.get();
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let (recipient, link, slots, width) = r.record::<WireSegmentHdr>()?.decode();
        let counts: Vec<u32> = if width == 0 {
            r.records::<u32>(slots)?
                .into_iter()
                .map(u32::from_le)
                .collect()
        } else {
            Vec::new()
        };
        let n_values = if width == 0 {
            counts.iter().map(|&c| c as usize).sum()
        } else {
            slots * width
        };
        let values = r.records::<E>(n_values)?;
        out.push(ExchangeBuffer {
            recipient: DomainId::new(recipient),
            link,
            slots,
            width,
            counts,
            values,
        });
    }
    if !r.buf.is_empty() {
        return Err(MeshHaloError::WireFormat(format!(
            "{} trailing bytes",
            r.buf.len()
        )));
    }
    Ok(out)
}
