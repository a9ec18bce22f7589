//! End-to-End Integration Tests
//!
//! These tests run full synchronisation passes through the SOAP transport
//! against a mocked student webservice and an in-memory local directory.

mod cli_flows;
mod common;
mod login_flows;
mod sync_flows;
