//! `accountd-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod email;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use email::Email;
pub use error::{AccountError, AccountResult, ErrorBody};
pub use id::IdentityId;
