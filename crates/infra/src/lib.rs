//! Infrastructure layer: persistence, per-identity serialization, config, and
//! the account service that composes them.

pub mod config;
pub mod locks;
pub mod service;
pub mod store;

pub use config::{ConfigError, ServiceConfig};
pub use locks::IdentityLocks;
pub use service::AccountService;
pub use store::{AccountStore, InMemoryAccountStore, Mutation, StoreError, UnitOfWork};
