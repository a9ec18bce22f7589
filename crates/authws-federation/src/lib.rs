//! # authws-federation
//!
//! Webservice user federation for authws.
//!
//! This crate authenticates users against a remote student registry and
//! reconciles the local directory with it:
//!
//! 1. [`client`] calls the registry through a [`client::DirectoryTransport`]
//! 2. [`normalize`] maps raw records to candidate identities
//! 3. [`staging`] deduplicates candidates and refuses an empty population
//! 4. [`planner`] diffs the staging set against the local directory
//! 5. [`applier`] creates, updates and suspends local identities
//!
//! [`sync::SyncEngine`] runs the whole pass and [`trace::TraceLog`] records
//! what happened.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod applier;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod planner;
pub mod provider;
pub mod staging;
pub mod sync;
pub mod trace;

pub use applier::{Applier, ApplyReport};
pub use client::{DirectoryClient, DirectoryTransport, RemoteValue, RequestParams};
pub use config::{FetchConfig, LoginConfig, MatchKey, RecordFields, WsConfig, WsConfigBuilder};
pub use error::{FederationError, FederationResult};
pub use normalize::{CandidateIdentity, RemoteRecord};
pub use planner::{plan, LocalSnapshot, PlannedUpdate, PlannerPolicy, ReconciliationPlan};
pub use provider::{AuthProvider, CredentialValidator, WsAuthProvider};
pub use staging::{stage, Stager, StagingSet};
pub use sync::{SyncEngine, SyncError, SyncReport};
pub use trace::{RejectReason, TraceEvent, TraceLevel, TraceLog};
