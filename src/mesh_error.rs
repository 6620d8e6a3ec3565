//! MeshHaloError: Unified error type for mesh-halo public APIs
//!
//! Every fallible operation in the crate returns this error. Variants fall into
//! four families (see [`ErrorKind`]): configuration errors describe a corrupt
//! decomposition upstream, usage errors describe a call made out of order,
//! missing neighbor data is recoverable and only ever logged by the exchanger,
//! and communication errors come from the transport.

use crate::topology::domain::DomainId;
use crate::topology::extents::IndexExtents;
use thiserror::Error;

/// Coarse classification of a [`MeshHaloError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal: the declared decomposition is inconsistent.
    Configuration,
    /// Fatal: the API was driven out of order or with unknown ids.
    Usage,
    /// Recoverable: a donor's data could not be obtained.
    MissingNeighborData,
    /// Recoverable per peer: the transport failed or delivered garbage.
    Communication,
}

/// Unified error type for mesh-halo operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshHaloError {
    // ----- configuration ---------------------------------------------------
    /// Two same-level domains overlap with positive volume.
    #[error("domains {a} and {b} interpenetrate over {overlap}")]
    InterpenetratingDomains {
        a: DomainId,
        b: DomainId,
        overlap: IndexExtents,
    },
    /// A finer patch is not aligned to the coarse grid of a domain it touches.
    #[error(
        "domain {domain} at level {level} has extents {extents} not aligned to refinement ratio {ratio:?}"
    )]
    MisalignedPatch {
        domain: DomainId,
        level: u32,
        extents: IndexExtents,
        ratio: [i32; 3],
    },
    /// Translating an index across levels left a remainder.
    #[error(
        "index {index:?} of domain {domain} has no exact image in domain {partner} (ratio {ratio:?})"
    )]
    NonIntegerTranslation {
        domain: DomainId,
        partner: DomainId,
        index: [i32; 3],
        ratio: [i32; 3],
    },
    /// A translated index fell outside the donor's real extents.
    #[error("index {index:?} translated from domain {domain} lies outside donor {partner}")]
    TranslationOutOfBounds {
        domain: DomainId,
        partner: DomainId,
        index: [i32; 3],
    },
    /// `finish` was called on links computed for extents that have since changed.
    #[error("domain {domain} changed extents from {old} to {new} but its links were not recomputed")]
    InconsistentExtents {
        domain: DomainId,
        old: IndexExtents,
        new: IndexExtents,
    },
    /// Refinement ratios must be >= 1 on every axis.
    #[error("invalid refinement ratio {ratio:?} for level {level}")]
    InvalidRefinementRatio { level: usize, ratio: [i32; 3] },
    /// Extents with `hi < lo` on some axis.
    #[error("invalid extents {extents} for domain {domain}")]
    InvalidExtents {
        domain: DomainId,
        extents: IndexExtents,
    },
    /// A configuration value is out of range.
    #[error("invalid boundary configuration: {0}")]
    InvalidConfig(String),

    // ----- usage -----------------------------------------------------------
    /// The id was never allocated by `set_num_domains`.
    #[error("domain {0} is not registered")]
    UnknownDomain(DomainId),
    /// Boundaries were queried before `finish`.
    #[error("boundaries of domain {0} are not finished")]
    NotFinished(DomainId),
    /// The link list of a finished domain was mutated.
    #[error("boundaries of domain {0} are already finished")]
    AlreadyFinished(DomainId),
    /// A step-wide setting changed while domains are finished.
    #[error("decomposition is finalized; call reset_cached_members first")]
    DomainsFinalized,
    /// Extents were never declared for the domain.
    #[error("domain {0} has no extents")]
    MissingExtents(DomainId),
    /// A link index does not exist in the domain's table.
    #[error("domain {domain} has no neighbor link {link}")]
    UnknownLink { domain: DomainId, link: usize },
    /// A requested domain has no field data on this worker.
    #[error("no field data supplied for requested domain {0}")]
    MissingField(DomainId),
    /// A field's dimensions do not match the domain's extents.
    #[error("field for domain {domain} has shape {found:?}, expected {expected:?}")]
    FieldShapeMismatch {
        domain: DomainId,
        expected: [usize; 3],
        found: [usize; 3],
    },
    /// A flat index lies outside a field buffer.
    #[error("index {index} out of range for field of {len} entries")]
    SliceOutOfRange { index: usize, len: usize },
    /// A tagged-union exchange was given payloads of different shapes.
    #[error("payload kinds differ across domains: {0}")]
    MixedPayloadKinds(String),

    // ----- recoverable -----------------------------------------------------
    /// Donor data for a seam could not be obtained.
    #[error("no donor data from domain {partner} for domain {domain}")]
    MissingNeighborData { domain: DomainId, partner: DomainId },

    // ----- communication ---------------------------------------------------
    /// A send or receive with a peer failed.
    #[error("communication with worker {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
    /// A received buffer could not be decoded.
    #[error("malformed exchange payload: {0}")]
    WireFormat(String),
}

impl MeshHaloError {
    /// Family of this error.
    pub fn kind(&self) -> ErrorKind {
        use MeshHaloError::*;
        match self {
            InterpenetratingDomains { .. }
            | MisalignedPatch { .. }
            | NonIntegerTranslation { .. }
            | TranslationOutOfBounds { .. }
            | InconsistentExtents { .. }
            | InvalidRefinementRatio { .. }
            | InvalidExtents { .. }
            | InvalidConfig(_) => ErrorKind::Configuration,
            UnknownDomain(_)
            | NotFinished(_)
            | AlreadyFinished(_)
            | DomainsFinalized
            | MissingExtents(_)
            | UnknownLink { .. }
            | MissingField(_)
            | FieldShapeMismatch { .. }
            | SliceOutOfRange { .. }
            | MixedPayloadKinds(_) => ErrorKind::Usage,
            MissingNeighborData { .. } => ErrorKind::MissingNeighborData,
            CommError { .. } | WireFormat(_) => ErrorKind::Communication,
        }
    }

    /// Whether the error must abort the current pipeline request.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Usage)
    }
}
