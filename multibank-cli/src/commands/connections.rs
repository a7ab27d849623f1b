//! Connection commands - list, add and remove banks

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use multibank_core::{BankConnection, OperationResult};
use serde::Serialize;

use super::get_context;
use crate::output;

#[derive(Serialize)]
struct ConnectionInfo {
    name: String,
    api_base_url: String,
    client_id: String,
}

pub fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let names = ctx.aggregation_service.list_connected();

    if json {
        let infos: Vec<ConnectionInfo> = names
            .iter()
            .filter_map(|name| ctx.config.bank(name))
            .map(|bank| ConnectionInfo {
                name: bank.name.clone(),
                api_base_url: bank.api_base_url.clone(),
                client_id: bank.client_id.clone(),
            })
            .collect();
        return output::print_json(&OperationResult::ok(infos));
    }

    if names.is_empty() {
        output::warning("No banks connected. Use 'mb connect' to add one.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Bank", "Base URL", "Client ID"]);
    for name in &names {
        if let Some(bank) = ctx.config.bank(name) {
            table.add_row(vec![
                bank.name.clone(),
                bank.api_base_url.clone(),
                bank.client_id.clone(),
            ]);
        }
    }
    println!("{}", table);
    Ok(())
}

pub fn connect(
    name: &str,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
    json: bool,
) -> Result<()> {
    let mut ctx = get_context()?;
    let replacing = ctx.config.bank(name).is_some();

    ctx.connect(BankConnection::new(name, base_url, client_id, client_secret))?;
    tracing::info!("Saved connection {} ({})", name, base_url);

    if json {
        return output::print_json(&OperationResult::ok(name));
    }
    if replacing {
        output::warning(&format!("Replaced existing connection '{}'", name));
    }
    output::success(&format!("Bank '{}' connected", name));
    Ok(())
}

pub fn disconnect(name: &str, force: bool, json: bool) -> Result<()> {
    let mut ctx = get_context()?;

    if ctx.config.bank(name).is_none() && ctx.aggregation_service.client(name).is_none() {
        let message = format!("Bank '{}' is not connected", name);
        if json {
            return output::print_json(&OperationResult::<bool>::fail(message));
        }
        output::error(&message);
        let names = ctx.aggregation_service.list_connected();
        if !names.is_empty() {
            eprintln!("{}", format!("Connected banks: {}", names.join(", ")).dimmed());
        }
        std::process::exit(1);
    }

    if !force {
        println!(
            "\n{}",
            format!("This will remove the '{}' connection.", name).yellow()
        );
        println!("{}\n", "Stored consents for this bank stay on disk.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let removed = ctx.disconnect(name)?;
    tracing::info!("Removed connection {} (was registered: {})", name, removed);
    if json {
        return output::print_json(&OperationResult::ok(removed));
    }
    output::success(&format!("Bank '{}' disconnected", name));
    Ok(())
}
