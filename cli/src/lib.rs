//! SOLPAY CLI library: argument types and command implementations

pub mod commands;

pub use commands::*;
