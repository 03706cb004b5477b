//! # tickethub-core
//!
//! Core crate for the TicketHub helpdesk platform. Contains configuration
//! schemas, logging setup, and the unified error system shared by every
//! other crate.
//!
//! This crate has **no** internal dependencies on other TicketHub crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
