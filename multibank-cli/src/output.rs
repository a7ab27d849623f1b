//! Output formatting utilities

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use multibank_core::{AccountRecord, OperationResult};
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner on stderr for long provider calls
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print an operation envelope as pretty JSON
pub fn print_json<T: Serialize>(result: &OperationResult<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// First balance of an account as `amount currency`
pub fn format_balance(record: &AccountRecord) -> String {
    match record.balances.as_deref() {
        None => "?".dimmed().to_string(),
        Some([]) => "-".to_string(),
        Some([first, ..]) => match &first.amount {
            Some(money) => format!("{} {}", money.amount, money.currency),
            None => "-".to_string(),
        },
    }
}

/// Transaction count, `?` when the history could not be fetched
pub fn format_transactions(record: &AccountRecord) -> String {
    match &record.transactions {
        Some(transactions) => transactions.len().to_string(),
        None => "?".dimmed().to_string(),
    }
}

/// Table of one customer's accounts
pub fn accounts_table(records: &[AccountRecord]) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        "Account",
        "Identification",
        "Type",
        "Currency",
        "Balance",
        "Transactions",
    ]);
    for record in records {
        table.add_row(vec![
            record.id.clone(),
            record.identification.clone().unwrap_or_default(),
            record.subtype.clone().or_else(|| record.account_type.clone()).unwrap_or_default(),
            record.currency.clone().unwrap_or_default(),
            format_balance(record),
            format_transactions(record),
        ]);
    }
    table
}
