//! CLI command implementations

pub mod account;
pub mod login;
pub mod transaction;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use eaglebank_core::services::gate::BEARER_PREFIX;
use eaglebank_core::{BankContext, Identity, OperationResult};
use serde::Serialize;

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("EAGLEBANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::home_dir()
        .context("Could not find home directory")?
        .join(".eaglebank"))
}

/// Open the bank, creating the data directory on first use
pub fn get_context() -> Result<BankContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    BankContext::new(&data_dir).context("Failed to initialize eaglebank context")
}

/// Run the token through the gate the same way an HTTP header would be
pub fn authenticate(ctx: &BankContext, token: Option<&str>) -> Result<Identity> {
    let header = token.map(|t| format!("{}{}", BEARER_PREFIX, t.trim()));
    Ok(ctx.authenticate(header.as_deref())?)
}

/// Print `data` wrapped in the success envelope
pub fn print_json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

/// Use `value` or ask for it
pub fn prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(label).interact_text()?),
    }
}

/// Use `value` or ask for it without echo
pub fn prompt_password(value: Option<String>, confirm: bool) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    let mut password = Password::new().with_prompt("Password");
    if confirm {
        password = password.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(password.interact()?)
}
