//! User commands - register and show users

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use eaglebank_core::{Address, NewUser, User};

use super::{authenticate, get_context, print_json, prompt, prompt_password};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create(CreateArgs),
    /// Show your own user record
    Show {
        /// User ID (usr-...)
        user_id: String,
    },
}

/// Anything required and omitted is prompted for
#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// E.164 phone number, e.g. +447700900123
    #[arg(long)]
    phone: Option<String>,
    #[arg(long = "address-line1")]
    line1: Option<String>,
    #[arg(long = "address-line2")]
    line2: Option<String>,
    #[arg(long = "address-line3")]
    line3: Option<String>,
    #[arg(long)]
    town: Option<String>,
    #[arg(long)]
    county: Option<String>,
    #[arg(long)]
    postcode: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

pub fn run(command: UserCommands, token: Option<&str>, json: bool) -> Result<()> {
    match command {
        UserCommands::Create(args) => run_create(args, json),
        UserCommands::Show { user_id } => run_show(&user_id, token, json),
    }
}

fn run_create(args: CreateArgs, json: bool) -> Result<()> {
    let details = NewUser {
        name: prompt(args.name, "Name")?,
        email: prompt(args.email, "Email")?,
        phone_number: prompt(args.phone, "Phone (+44...)")?,
        address: Address::new(
            prompt(args.line1, "Address line 1")?,
            prompt(args.town, "Town")?,
            prompt(args.county, "County")?,
            prompt(args.postcode, "Postcode")?,
        )
        .with_lines(args.line2, args.line3),
        password: prompt_password(args.password, true)?,
    };

    let ctx = get_context()?;
    let user = ctx.user_service.create_user(&details)?;

    if json {
        return print_json(&user);
    }
    output::success("User created");
    println!("  ID:    {}", user.id.bold());
    println!("  Name:  {}", user.name);
    println!("  Email: {}", user.email);
    output::info("Run `eb login` to get a token");
    Ok(())
}

fn run_show(user_id: &str, token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = authenticate(&ctx, token)?;
    let user = ctx.user_service.fetch_user(user_id, &caller)?;

    if json {
        return print_json(&user);
    }
    println!("{}", user.name.bold());
    println!("  ID:      {}", user.id);
    println!("  Email:   {}", user.email);
    println!("  Phone:   {}", user.phone_number);
    print_address(&user);
    println!("  Created: {}", output::timestamp(&user.created_at));
    Ok(())
}

fn print_address(user: &User) {
    let address = &user.address;
    let lines = [
        Some(address.line1.as_str()),
        address.line2.as_deref(),
        address.line3.as_deref(),
        Some(address.town.as_str()),
        Some(address.county.as_str()),
        Some(address.postcode.as_str()),
    ];
    for (i, line) in lines.into_iter().flatten().enumerate() {
        let label = if i == 0 { "Address:" } else { "" };
        println!("  {:<8} {}", label, line);
    }
}
