//! SOLPAY Ledger
//!
//! An in-memory ledger that implements the collaborator traits the payment
//! layer queries. Transactions are indexed by every account they touch, the
//! same way a real ledger node answers "signatures for address" queries.

pub mod entry;
pub mod memory;

pub use entry::*;
pub use memory::*;
