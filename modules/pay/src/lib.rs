//! SOLPAY Payment Module
//!
//! Implements the payment-request protocol:
//! - Payment URIs (transfer and transaction-request forms)
//! - Unsigned transfer construction with reference keys attached
//! - Reference lookup and transaction fetch as bounded polls
//! - Validation of a landed transaction against the request

pub mod descriptor;
pub mod uri;
pub mod instruction;
pub mod message;
pub mod builder;
pub mod poll;
pub mod locator;
pub mod fetcher;
pub mod validator;
pub mod confirm;

#[cfg(test)]
pub(crate) mod test_support;

pub use descriptor::*;
pub use uri::*;
pub use instruction::*;
pub use message::*;
pub use builder::*;
pub use poll::*;
pub use locator::*;
pub use fetcher::*;
pub use validator::*;
pub use confirm::*;
