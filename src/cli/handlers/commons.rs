// src/cli/handlers/commons.rs

// Shared helpers for the CLI handlers.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use serde_json::Value;

use crate::{Environment, Record, system::engine_config};

/// Loads `config.toml` and starts an environment from it.
pub fn open_environment() -> Result<Environment> {
    let config = engine_config::load_engine_config().context("Could not load psenv config")?;
    log::debug!("Engine config: {:?}", config);
    Ok(Environment::new(&config)?)
}

/// Parses a `Name=Value` pair. The value is taken as JSON when it parses as a
/// number, boolean, null, array or object, and as a plain string otherwise.
pub fn parse_param(raw: &str) -> Result<(String, Value)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Parameter '{}' must look like Name=Value.", raw.cyan()))?;
    let name = name.trim().trim_start_matches('-');
    if name.is_empty() {
        return Err(anyhow!("Parameter '{}' has an empty name.", raw.cyan()));
    }

    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed) if !parsed.is_string() => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((name.to_string(), value))
}

/// Renders a property value for terminal output: strings bare, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Prints records one per line: the requested field, or the whole record as JSON.
pub fn print_records(records: &[Record], field: Option<&str>) -> Result<()> {
    for record in records {
        match field {
            Some(field) => println!(
                "{}",
                record.property(field).map(display_value).unwrap_or_default()
            ),
            None => println!("{}", serde_json::to_string(record)?),
        }
    }
    Ok(())
}

/// Closes the environment, reporting failures as warnings so they never mask the action's result.
pub fn finish(mut env: Environment) {
    if let Err(e) = env.close() {
        log::warn!("Failed to close PowerShell environment: {}", e);
    }
}
