//! Field exchange across domain boundaries.

pub mod collective;
pub mod field_exchanger;
pub mod payload;

#[cfg(feature = "mpi-support")]
pub use collective::MpiExchange;
pub use collective::{CollectiveExchange, CommExchange, LocalExchange};
pub use field_exchanger::FieldExchanger;
pub use payload::{DomainFields, ExchangeBuffer, FieldPayload, GhostField};
