//! Ticket lifecycle for the incident ops gateway.
//!
//! `TicketBackend` is the capability every ticket system implements;
//! `MockTicketStore` is the JSON-file backed implementation used by the
//! CLI and tests. Both confirmation-gate their writes independently of the
//! policy gate in front of them.

pub mod backend;
pub mod error;
pub mod mock;

pub use backend::TicketBackend;
pub use error::{TicketError, TicketResult};
pub use mock::{MockTicketStore, StoreState};
