//! SOLPAY Core Library
//!
//! Core types, traits, and abstractions for the SOLPAY payment-request layer.
//! This crate provides the foundation for all other SOLPAY components.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;
pub mod amount;
pub mod message;
pub mod cancel;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
pub use amount::*;
pub use message::*;
pub use cancel::*;
