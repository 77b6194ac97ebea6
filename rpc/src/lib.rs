//! SOLPAY RPC
//!
//! A thin JSON-RPC adapter implementing the ledger collaborator traits
//! against a real ledger node.

pub mod error;
pub mod wire;
pub mod client;

pub use error::*;
pub use client::*;
