//! Output formatting utilities

use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use eaglebank_core::{Currency, TransactionType};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn money(amount: Decimal, currency: Currency) -> String {
    format!("{} {:.2}", currency, amount)
}

/// Right-aligned amount cell, signed by direction
pub fn amount_cell(amount: Decimal, currency: Currency, kind: TransactionType) -> Cell {
    let text = match kind {
        TransactionType::Deposit => format!("+{}", money(amount, currency)).green(),
        TransactionType::Withdrawal => format!("-{}", money(amount, currency)).red(),
    };
    Cell::new(text.to_string()).set_alignment(CellAlignment::Right)
}

pub fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
