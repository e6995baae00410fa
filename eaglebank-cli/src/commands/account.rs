//! Account commands - open, list and show accounts

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use eaglebank_core::Account;

use super::{authenticate, get_context, print_json, prompt};
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new GBP account
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// List your accounts
    List,
    /// Show one account
    Show {
        /// Account number (01NNNNNN)
        account_number: String,
    },
}

pub fn run(command: AccountCommands, token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = authenticate(&ctx, token)?;

    match command {
        AccountCommands::Create { name } => {
            let name = prompt(name, "Account name")?;
            let account = ctx.account_service.create_account(&caller, &name)?;
            if json {
                return print_json(&account);
            }
            output::success("Account opened");
            print_account(&account);
        }
        AccountCommands::List => {
            let accounts = ctx.account_service.list_accounts(&caller)?;
            if json {
                return print_json(&accounts);
            }
            if accounts.is_empty() {
                output::info("No accounts yet. Open one with `eb account create`");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Number", "Name", "Sort code", "Balance", "Opened"]);
            for account in &accounts {
                table.add_row(vec![
                    Cell::new(&account.account_number),
                    Cell::new(&account.name),
                    Cell::new(&account.sort_code),
                    Cell::new(output::money(account.balance, account.currency))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(output::timestamp(&account.created_at)),
                ]);
            }
            println!("{}", table);
        }
        AccountCommands::Show { account_number } => {
            let account = ctx.account_service.fetch_account(&account_number, &caller)?;
            if json {
                return print_json(&account);
            }
            print_account(&account);
        }
    }
    Ok(())
}

fn print_account(account: &Account) {
    println!("{}", account.name.bold());
    println!("  Number:    {}", account.account_number);
    println!("  Sort code: {}", account.sort_code);
    println!("  Type:      {}", account.account_type.as_str());
    println!("  Balance:   {}", output::money(account.balance, account.currency));
    println!("  Opened:    {}", output::timestamp(&account.created_at));
}
