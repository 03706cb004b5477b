//! # tickethub-database
//!
//! Persistent-store capability for TicketHub. Defines the
//! [`store::PrincipalStore`] trait — account lookup plus the atomic
//! conditional-write primitives the session core depends on — together
//! with a PostgreSQL implementation and an in-memory implementation for
//! single-node development and tests.

pub mod connection;
pub mod migration;
pub mod store;

pub use connection::DatabasePool;
pub use store::{MemoryPrincipalStore, PgPrincipalStore, PrincipalStore};
