//! Output formatting utilities.

use authws_federation::{TraceLevel, TraceLog};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::config::OutputFormat;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Outputs rows in the specified format.
pub fn output<T: Tabled + serde::Serialize>(
    data: &[T],
    format: OutputFormat,
) -> crate::CliResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                info("No results found.");
            } else {
                let table = Table::new(data).with(Style::rounded()).to_string();
                println!("{table}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{json}");
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// Outputs a single item as JSON, or as key/value lines for tables.
pub fn output_single<T: serde::Serialize>(item: &T, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Table => {
            if let serde_json::Value::Object(map) = serde_json::to_value(item)? {
                for (key, value) in map {
                    match value {
                        serde_json::Value::String(s) => println!("{key}: {s}"),
                        serde_json::Value::Array(items) => println!("{key}: {}", items.len()),
                        other => println!("{key}: {other}"),
                    }
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item)?;
            println!("{json}");
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// Prints trace lines at or above a severity.
pub fn trace(log: &TraceLog, min: TraceLevel) {
    for event in log.events().iter().filter(|e| e.level() >= min) {
        let line = event.to_string();
        match event.level() {
            TraceLevel::Info => info(&line),
            TraceLevel::Warn => warning(&line),
            TraceLevel::Error => error(&line),
        }
    }
}

/// Prompts for password input (hidden).
pub fn prompt_password(prompt: &str) -> crate::CliResult<String> {
    Ok(rpassword::prompt_password(prompt)?)
}
