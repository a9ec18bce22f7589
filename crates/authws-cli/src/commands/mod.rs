//! Command implementations.

pub mod config;
pub mod login;
pub mod sync;
pub mod users;

pub use config::run_config;
pub use login::run_login;
pub use sync::run_sync;
pub use users::run_users;

use authws_federation::WsConfig;
use authws_federation_soap::SoapTransport;

/// Builds the SOAP transport for an enabled provider.
///
/// Every command that talks to the webservice goes through here so the
/// enabled flag is honoured in one place.
fn transport(ws: &WsConfig) -> crate::CliResult<SoapTransport> {
    if !ws.enabled {
        return Err(crate::CliError::Disabled);
    }
    Ok(SoapTransport::from_ws_config(ws)?)
}
