//! # authws-model
//!
//! Domain records for the authws directory synchroniser.
//!
//! This crate defines the local identity record owned by the user directory,
//! the partial records used to create and update it, and the session record
//! that is invalidated when an identity is suspended.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod identity;
pub mod session;
pub mod username;

pub use identity::{IdentityUpdate, LocalIdentity, NewIdentity};
pub use session::{SessionState, UserSession};
pub use username::sanitize_username;
