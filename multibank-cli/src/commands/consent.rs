//! Consent command - request a fresh account-access consent

use anyhow::Result;
use colored::Colorize;
use multibank_core::OperationResult;

use super::get_context;
use crate::output;

pub async fn run(bank: &str, customer: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let pb = (!json).then(|| output::spinner(&format!("Requesting consent from {}...", bank)));
    let consent_id = ctx
        .aggregation_service
        .request_account_consent(bank, customer)
        .await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if json {
        let result = match &consent_id {
            Some(id) => OperationResult::ok(id.clone()),
            None => OperationResult::fail("no approved consent; it may await manual approval"),
        };
        return output::print_json(&result);
    }

    match consent_id {
        Some(id) => {
            output::success(&format!("Consent approved for {} at {}", customer, bank));
            println!("  Consent ID: {}", id.bold());
        }
        None => {
            output::warning(&format!(
                "No approved consent for {} at {}.",
                customer, bank
            ));
            println!(
                "{}",
                "The bank may require manual approval; run with -v for details.".dimmed()
            );
        }
    }
    Ok(())
}
