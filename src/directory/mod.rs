//! User directory and credential store collaborators.
//!
//! The directory owns the durable `users` rows (role, confirmation flag,
//! optional personal-secret hash, link to the account record) and the
//! `accounts` rows (email + password hash). All access goes through
//! [`storage`]; the verification and binding handlers never issue queries
//! themselves.

mod models;
pub mod storage;

pub use self::models::{Account, PublicUser, Role, User};
