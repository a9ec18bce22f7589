//! Configuration management commands.

use std::io::{BufRead, Write};
use std::path::Path;

use authws_federation::{MatchKey, WsConfig};

use crate::cli::ConfigCommand;
use crate::output::{info, success};
use crate::CliConfig;

/// Runs a config command.
pub fn run_config(cmd: &ConfigCommand, config: &mut CliConfig, path: &Path) -> crate::CliResult<()> {
    match cmd {
        ConfigCommand::Show => {
            show_config(config, path);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Init => {
            let stdin = std::io::stdin();
            init_config(config, &mut stdin.lock())?;
            config.save_to(path)?;
            println!();
            success(&format!("Configuration saved to: {}", path.display()));
            Ok(())
        }
    }
}

/// Shows the current configuration.
fn show_config(config: &CliConfig, path: &Path) {
    info(&format!("Configuration file: {}", path.display()));
    println!();
    println!("directory: {}", config.directory.display());
    println!("output_format: {:?}", config.output_format);

    let Some(ws) = &config.ws else {
        println!("ws: not configured");
        return;
    };
    println!("ws.server_url: {}", ws.server_url);
    println!("ws.default_params: {}", mask_params(ws));
    println!("ws.auth_method: {}", ws.auth_method);
    println!("ws.match_key: {}", ws.match_key.field_name());
    println!("ws.enabled: {}", ws.enabled);
    println!("ws.fetch: {} ({})", ws.fetch.operation, ws.fetch.filter);
    println!("ws.login: {}", ws.login.operation);
    if let Some(url) = ws.change_password_url() {
        println!("ws.change_password_url: {url}");
    }
}

/// Renders the default parameters with their values masked.
///
/// Default parameters usually carry the webservice access key.
fn mask_params(ws: &WsConfig) -> String {
    ws.default_params
        .names()
        .map(|name| format!("{name}:****"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Reads one answer, keeping `current` on an empty line.
fn ask(input: &mut impl BufRead, prompt: &str, current: &str) -> crate::CliResult<String> {
    print!("{prompt} [{current}]: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        current.to_string()
    } else {
        trimmed.to_string()
    })
}

/// Initializes configuration interactively.
fn init_config(config: &mut CliConfig, input: &mut impl BufRead) -> crate::CliResult<()> {
    info("Initializing authws configuration...");
    println!();

    let current = config.ws.clone();
    let directory = ask(input, "Directory file", &config.directory.display().to_string())?;
    let server_url = ask(
        input,
        "Webservice URL",
        current.as_ref().map_or("", |ws| ws.server_url.as_str()),
    )?;
    let default_params = ask(
        input,
        "Default parameters (name:value,...)",
        &current
            .as_ref()
            .map(|ws| ws.default_params.to_string())
            .unwrap_or_default(),
    )?;
    let match_key = ask(
        input,
        "Match key (idnumber/username)",
        current
            .as_ref()
            .map_or(MatchKey::Idnumber, |ws| ws.match_key)
            .field_name(),
    )?;
    let match_key = match match_key.to_lowercase().as_str() {
        "idnumber" => MatchKey::Idnumber,
        "username" => MatchKey::Username,
        other => {
            return Err(crate::CliError::Config(format!(
                "unknown match key: {other}. Supported: idnumber, username"
            )))
        }
    };

    // Keep the remaining settings of an existing section.
    let mut builder = WsConfig::builder();
    if let Some(ws) = current {
        builder = builder
            .namespace(ws.namespace)
            .login(ws.login)
            .fetch(ws.fetch)
            .auth_method(ws.auth_method)
            .realm_id(ws.realm_id)
            .protected_ids(ws.protected_ids)
            .enabled(ws.enabled)
            .connection_timeout(ws.connection_timeout)
            .read_timeout(ws.read_timeout);
        if let Some(url) = ws.change_password_url {
            builder = builder.change_password_url(url);
        }
    }

    config.ws = Some(
        builder
            .server_url(server_url)
            .default_params(default_params)
            .match_key(match_key)
            .build()?,
    );
    config.directory = directory.into();
    Ok(())
}
