//! # tickethub-auth
//!
//! Session and refresh-token lifecycle management for the TicketHub
//! helpdesk platform.
//!
//! ## Modules
//!
//! - `token` — signed, time-bound credential issuing and verification
//! - `password` — Argon2id password hashing and verification
//! - `session` — per-account session collection, rotation coordination,
//!   and device classification
//! - `gateway` — login/logout/refresh/session-listing orchestration

pub mod gateway;
pub mod password;
pub mod session;
pub mod token;

pub use gateway::{AuthenticationGateway, LoginGrant, LoginInput, LogoutRequest};
pub use password::PasswordHasher;
pub use session::{RefreshCoordinator, RefreshGrant, SessionManager};
pub use token::{Claims, TokenPair, TokenService};
