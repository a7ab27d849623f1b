//! Account commands - fetch accounts from one bank or many

use anyhow::Result;
use colored::Colorize;
use multibank_core::{AggregationResult, BankAccountRequest, CustomerAccounts, OperationResult};

use super::get_context;
use crate::output;

/// Parse `bank=customer1,customer2`
pub fn parse_bank_request(s: &str) -> Result<BankAccountRequest, String> {
    let (bank, customers) = s
        .split_once('=')
        .ok_or_else(|| format!("expected BANK=CUSTOMER[,CUSTOMER...], got '{}'", s))?;
    let bank = bank.trim();
    if bank.is_empty() {
        return Err("bank name cannot be empty".to_string());
    }
    let client_ids: Vec<String> = customers
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if client_ids.is_empty() {
        return Err(format!("no customers given for bank '{}'", bank));
    }
    Ok(BankAccountRequest::new(bank, client_ids))
}

pub async fn run(bank: &str, customers: Vec<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let pb = (!json).then(|| output::spinner(&format!("Fetching accounts from {}...", bank)));
    let accounts = ctx.aggregation_service.fetch_accounts(bank, &customers).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    if let Some(accounts) = &accounts {
        tracing::info!(
            "Fetched {} accounts for {} customers from {}",
            accounts.values().map(Vec::len).sum::<usize>(),
            accounts.len(),
            bank
        );
    }

    if json {
        let result = match accounts {
            Some(accounts) => OperationResult::ok(accounts),
            None => OperationResult::fail(format!("failed to fetch accounts from {}", bank)),
        };
        return output::print_json(&result);
    }

    match accounts {
        Some(accounts) => print_bank(bank, &accounts),
        None => output::error(&format!(
            "Failed to fetch accounts from {} (run with -v for details)",
            bank
        )),
    }
    Ok(())
}

pub async fn bulk(requests: Vec<BankAccountRequest>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let pb = (!json).then(|| {
        output::spinner(&format!("Fetching accounts from {} banks...", requests.len()))
    });
    let results: AggregationResult = ctx
        .aggregation_service
        .fetch_accounts_multi(&requests)
        .await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let failed = results.values().filter(|accounts| accounts.is_none()).count();
    tracing::info!("Bulk fetch finished: {} banks, {} failed", results.len(), failed);

    if json {
        return output::print_json(&OperationResult::ok(results));
    }

    for (bank, accounts) in &results {
        match accounts {
            Some(accounts) => print_bank(bank, accounts),
            None => println!("{} {}", "Failed:".red(), bank),
        }
        println!();
    }
    Ok(())
}

fn print_bank(bank: &str, accounts: &CustomerAccounts) {
    println!("{}", bank.bold());
    for (customer, records) in accounts {
        if records.is_empty() {
            println!("  {} {}", customer, "(no accounts)".dimmed());
            continue;
        }
        println!("  {}", customer.cyan());
        println!("{}", output::accounts_table(records));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bank_request() {
        let request = parse_bank_request("vbank=team-1, team-2").unwrap();
        assert_eq!(request.bank_name, "vbank");
        assert_eq!(request.client_ids, vec!["team-1", "team-2"]);
    }

    #[test]
    fn test_parse_bank_request_rejects_malformed() {
        assert!(parse_bank_request("vbank").is_err());
        assert!(parse_bank_request("=team-1").is_err());
        assert!(parse_bank_request("vbank=,").is_err());
    }
}
