//! Credential check command.

use authws_federation::{AuthProvider, CredentialValidator, WsAuthProvider};

use crate::cli::LoginArgs;
use crate::output::{info, prompt_password, success};
use crate::CliConfig;

/// Runs the login command.
pub async fn run_login(args: LoginArgs, config: &CliConfig) -> crate::CliResult<()> {
    let ws = config.ws()?;
    let provider = WsAuthProvider::new(ws.clone(), super::transport(ws)?);

    let password = match args.password {
        Some(password) => password,
        None => prompt_password("Password: ")?,
    };

    if provider.validate_password(&args.username, &password).await? {
        success(&format!("Credentials accepted for {}", args.username));
        Ok(())
    } else {
        if let Some(url) = provider.change_password_url() {
            info(&format!("Forgotten passwords are changed at {url}"));
        }
        Err(crate::CliError::InvalidCredentials(args.username))
    }
}
