//! Transaction commands - deposit, withdraw and history

use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use eaglebank_core::{Currency, Error, Transaction, TransactionRequest, TransactionType};
use rust_decimal::Decimal;

use super::{authenticate, get_context, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum TxCommands {
    /// Pay money into an account
    Deposit(MovementArgs),
    /// Take money out of an account
    Withdraw(MovementArgs),
    /// List an account's transactions, oldest first
    List {
        /// Account number (01NNNNNN)
        account_number: String,
    },
    /// Show one transaction
    Show {
        account_number: String,
        /// Transaction ID (tan-...)
        transaction_id: String,
    },
}

#[derive(Args)]
pub struct MovementArgs {
    /// Account number (01NNNNNN)
    account_number: String,
    /// Amount, e.g. 12.50
    amount: String,
    #[arg(long, default_value = "GBP")]
    currency: String,
    #[arg(long)]
    reference: Option<String>,
}

pub fn run(command: TxCommands, token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = authenticate(&ctx, token)?;

    match command {
        TxCommands::Deposit(args) => {
            let request = build_request(&args, TransactionType::Deposit)?;
            let tx = ctx
                .transaction_service
                .create_transaction(&args.account_number, &caller, &request)?;
            report(&tx, json)
        }
        TxCommands::Withdraw(args) => {
            let request = build_request(&args, TransactionType::Withdrawal)?;
            let tx = ctx
                .transaction_service
                .create_transaction(&args.account_number, &caller, &request)?;
            report(&tx, json)
        }
        TxCommands::List { account_number } => {
            let history = ctx
                .transaction_service
                .list_transactions(&account_number, &caller)?;
            if json {
                return print_json(&history);
            }
            if history.is_empty() {
                output::info("No transactions");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Type", "Amount", "Reference", "Time"]);
            for tx in &history {
                table.add_row(vec![
                    Cell::new(&tx.id),
                    Cell::new(tx.transaction_type.as_str()),
                    output::amount_cell(tx.amount, tx.currency, tx.transaction_type),
                    Cell::new(tx.reference.as_deref().unwrap_or("")),
                    Cell::new(output::timestamp(&tx.created_at)),
                ]);
            }
            println!("{}", table);
            Ok(())
        }
        TxCommands::Show {
            account_number,
            transaction_id,
        } => {
            let tx = ctx
                .transaction_service
                .fetch_transaction(&account_number, &transaction_id, &caller)?;
            if json {
                return print_json(&tx);
            }
            print_transaction(&tx);
            Ok(())
        }
    }
}

fn build_request(args: &MovementArgs, kind: TransactionType) -> Result<TransactionRequest> {
    let amount = Decimal::from_str(args.amount.trim())
        .map_err(|_| Error::validation(format!("{:?} is not an amount", args.amount)))?;
    let currency = Currency::from_str(&args.currency)?;

    let mut request = TransactionRequest::new(amount, currency, kind);
    if let Some(reference) = args.reference.as_deref().filter(|r| !r.trim().is_empty()) {
        request = request.with_reference(reference);
    }
    Ok(request)
}

fn report(tx: &Transaction, json: bool) -> Result<()> {
    if json {
        return print_json(tx);
    }
    let verb = match tx.transaction_type {
        TransactionType::Deposit => "Deposited",
        TransactionType::Withdrawal => "Withdrew",
    };
    output::success(&format!(
        "{} {} on {}",
        verb,
        output::money(tx.amount, tx.currency),
        tx.account_number
    ));
    print_transaction(tx);
    Ok(())
}

fn print_transaction(tx: &Transaction) {
    println!("  ID:        {}", tx.id);
    println!("  Account:   {}", tx.account_number);
    println!("  Type:      {}", tx.transaction_type);
    println!("  Amount:    {}", output::money(tx.amount, tx.currency));
    if let Some(reference) = &tx.reference {
        println!("  Reference: {}", reference);
    }
    println!("  Time:      {}", output::timestamp(&tx.created_at));
}
