//! # authws-storage
//!
//! Storage abstraction for the local user directory.
//!
//! The synchroniser treats the directory as an external collaborator. This
//! crate defines the interfaces it consumes and ships two backends: an
//! in-memory directory and a JSON file wrapper around it.
//!
//! ## Provider Traits
//!
//! - [`LocalDirectory`] - lookup, creation, bulk update and suspension of identities
//! - [`SessionStore`] - invalidation of a user's login sessions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
pub mod error;
pub mod file;
pub mod memory;
pub mod session;

pub use directory::{BulkUpdateOutcome, LocalDirectory, RejectedUpdate};
pub use error::{StorageError, StorageResult};
pub use file::JsonDirectoryFile;
pub use memory::{DirectoryState, InMemoryDirectory};
pub use session::SessionStore;
