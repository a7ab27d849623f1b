//! Payment commands - request a payment consent and execute a payment

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use multibank_core::{OperationResult, PaymentConsentRequest};
use serde_json::Value as JsonValue;

use super::{get_context, read_json_file};
use crate::output;

pub async fn consent(bank: &str, file: &Path, json: bool) -> Result<()> {
    let request: PaymentConsentRequest = read_json_file(file)?;
    let ctx = get_context()?;

    let pb = (!json).then(|| {
        output::spinner(&format!(
            "Requesting {} payment consent from {}...",
            request.consent_type(),
            bank
        ))
    });
    let consent_id = ctx
        .aggregation_service
        .request_payment_consent(bank, &request)
        .await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if json {
        let result = match &consent_id {
            Some(id) => OperationResult::ok(id.clone()),
            None => OperationResult::fail(format!("payment consent request to {} failed", bank)),
        };
        return output::print_json(&result);
    }

    match consent_id {
        Some(id) => {
            output::success(&format!(
                "Payment consent issued for {} at {}",
                request.client_id(),
                bank
            ));
            println!("  Consent ID: {}", id.bold());
        }
        None => output::error(&format!(
            "Payment consent request to {} failed (run with -v for details)",
            bank
        )),
    }
    Ok(())
}

pub async fn pay(
    bank: &str,
    customer: &str,
    consent_id: &str,
    file: &Path,
    json: bool,
) -> Result<()> {
    let body: JsonValue = read_json_file(file)?;
    let ctx = get_context()?;

    let pb = (!json).then(|| output::spinner(&format!("Submitting payment to {}...", bank)));
    let status = ctx
        .aggregation_service
        .execute_payment(bank, customer, consent_id, body)
        .await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if json {
        let result = match status {
            Some(status) => OperationResult::ok(status),
            None => OperationResult::fail(format!("payment at {} failed", bank)),
        };
        return output::print_json(&result);
    }

    match status {
        Some(status) => {
            output::success(&format!("Payment submitted to {}", bank));
            let mut table = output::create_table();
            table.add_row(vec![
                "Payment ID",
                status.data.payment_id.as_deref().unwrap_or("-"),
            ]);
            table.add_row(vec!["Status", status.data.status.as_deref().unwrap_or("-")]);
            println!("{}", table);
        }
        None => output::error(&format!(
            "Payment at {} failed (run with -v for details)",
            bank
        )),
    }
    Ok(())
}
