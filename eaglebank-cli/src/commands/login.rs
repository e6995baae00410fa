//! Login command - prints a bearer token
//!
//! Only the token goes to stdout, so `export EB_TOKEN=$(eb login ...)` works.

use anyhow::Result;
use serde::Serialize;

use super::{get_context, print_json, prompt, prompt_password};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_in_hours: i64,
}

pub fn run(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let email = prompt(email, "Email")?;
    let password = prompt_password(password, false)?;

    let ctx = get_context()?;
    let token = ctx.authentication_service.authenticate(&email, &password)?;

    if json {
        return print_json(LoginResponse {
            token,
            expires_in_hours: ctx.config.token_ttl_hours,
        });
    }
    println!("{}", token);
    Ok(())
}
