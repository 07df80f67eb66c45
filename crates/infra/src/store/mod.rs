//! Persistence boundary for identities, role memberships, failure counters,
//! payroll and the audit log.
//!
//! Reads are plain queries. Every write goes through [`AccountStore::commit`]
//! with a [`UnitOfWork`], which is applied completely or not at all.

pub mod in_memory;
pub mod r#trait;
pub mod unit_of_work;

pub use in_memory::InMemoryAccountStore;
pub use r#trait::{AccountStore, StoreError};
pub use unit_of_work::{Mutation, UnitOfWork};
