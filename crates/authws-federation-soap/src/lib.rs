//! # authws-federation-soap
//!
//! SOAP transport for the authws remote directory client.
//!
//! [`SoapTransport`] implements [`authws_federation::DirectoryTransport`]
//! with SOAP 1.1 over HTTP(S), using `reqwest` for the wire and
//! `quick-xml` to decode responses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod envelope;
pub mod error;
pub mod response;
pub mod transport;

pub use config::SoapConfig;
pub use error::{SoapError, SoapResult};
pub use transport::SoapTransport;
