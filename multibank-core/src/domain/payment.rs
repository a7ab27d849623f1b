//! Payment consent and payment execution models
//!
//! A payment consent request is one of four shapes, told apart on the wire by
//! `consent_type`. Both single-use shapes share the `"single_use"` tag; the
//! presence of `creditor_account` decides which one a payload is.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

/// Single payment to a known creditor account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleUseWithCreditor {
    pub requesting_bank: String,
    pub client_id: String,
    pub amount: Decimal,
    pub debtor_account: String,
    pub creditor_account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creditor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Single payment where the creditor is supplied at execution time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleUseWithoutCreditor {
    pub requesting_bank: String,
    pub client_id: String,
    pub amount: Decimal,
    pub debtor_account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Reusable consent bounded by a use count and per-payment amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiUseConsent {
    pub requesting_bank: String,
    pub client_id: String,
    pub debtor_account: String,
    pub max_uses: u32,
    pub max_amount_per_payment: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_creditor_accounts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Variable recurring payment consent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrpConsent {
    pub requesting_bank: String,
    pub client_id: String,
    pub debtor_account: String,
    pub vrp_max_individual_amount: Decimal,
    pub vrp_daily_limit: Decimal,
    pub vrp_monthly_limit: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Body of `POST /payment-consents/request`
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentConsentRequest {
    SingleUseWithCreditor(SingleUseWithCreditor),
    SingleUseWithoutCreditor(SingleUseWithoutCreditor),
    MultiUse(MultiUseConsent),
    Vrp(VrpConsent),
}

impl PaymentConsentRequest {
    /// Wire tag written to `consent_type`
    pub fn consent_type(&self) -> &'static str {
        match self {
            Self::SingleUseWithCreditor(_) | Self::SingleUseWithoutCreditor(_) => "single_use",
            Self::MultiUse(_) => "multi_use",
            Self::Vrp(_) => "vrp",
        }
    }

    /// Customer the consent is requested for
    pub fn client_id(&self) -> &str {
        match self {
            Self::SingleUseWithCreditor(r) => &r.client_id,
            Self::SingleUseWithoutCreditor(r) => &r.client_id,
            Self::MultiUse(r) => &r.client_id,
            Self::Vrp(r) => &r.client_id,
        }
    }

    pub fn debtor_account(&self) -> &str {
        match self {
            Self::SingleUseWithCreditor(r) => &r.debtor_account,
            Self::SingleUseWithoutCreditor(r) => &r.debtor_account,
            Self::MultiUse(r) => &r.debtor_account,
            Self::Vrp(r) => &r.debtor_account,
        }
    }
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    consent_type: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for PaymentConsentRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let consent_type = self.consent_type();
        match self {
            Self::SingleUseWithCreditor(body) => Tagged { consent_type, body }.serialize(serializer),
            Self::SingleUseWithoutCreditor(body) => {
                Tagged { consent_type, body }.serialize(serializer)
            }
            Self::MultiUse(body) => Tagged { consent_type, body }.serialize(serializer),
            Self::Vrp(body) => Tagged { consent_type, body }.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PaymentConsentRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        let consent_type = value
            .get("consent_type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| D::Error::missing_field("consent_type"))?
            .to_string();
        let has_creditor = value
            .get("creditor_account")
            .is_some_and(|v| !v.is_null());

        let parsed = match consent_type.as_str() {
            "single_use" if has_creditor => {
                serde_json::from_value(value).map(Self::SingleUseWithCreditor)
            }
            "single_use" => serde_json::from_value(value).map(Self::SingleUseWithoutCreditor),
            "multi_use" => serde_json::from_value(value).map(Self::MultiUse),
            "vrp" => serde_json::from_value(value).map(Self::Vrp),
            other => {
                return Err(D::Error::unknown_variant(
                    other,
                    &["single_use", "multi_use", "vrp"],
                ))
            }
        };
        parsed.map_err(D::Error::custom)
    }
}

/// Provider answer to a payment consent request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConsentResponse {
    #[serde(default)]
    pub request_id: String,
    pub consent_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub consent_type: String,
    #[serde(default)]
    pub auto_approved: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
}

/// `data` section of a payment execution response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusData {
    #[serde(default, rename = "paymentId")]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Provider answer to `POST /payments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub data: PaymentStatusData,
    #[serde(default)]
    pub links: JsonValue,
    #[serde(default)]
    pub meta: JsonValue,
}

/// Put a caller-supplied payment body into `{"data": {"initiation": ...}}`
///
/// Bodies that already carry `data.initiation` are sent untouched. A body
/// with a `data` object gets that object as the initiation; anything else is
/// treated as the initiation itself.
pub fn wrap_initiation(body: JsonValue) -> JsonValue {
    let already_wrapped = body
        .get("data")
        .and_then(|d| d.get("initiation"))
        .is_some();
    if already_wrapped {
        return body;
    }
    match body {
        JsonValue::Object(mut map) if map.get("data").is_some_and(|d| d.is_object()) => {
            let data = map.remove("data").unwrap_or(JsonValue::Null);
            json!({ "data": { "initiation": data } })
        }
        other => json!({ "data": { "initiation": other } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_use_with_creditor_round_trip_tag() {
        let request = PaymentConsentRequest::SingleUseWithCreditor(SingleUseWithCreditor {
            requesting_bank: "team".to_string(),
            client_id: "team-1".to_string(),
            amount: Decimal::new(150000, 2),
            debtor_account: "4081".to_string(),
            creditor_account: "4082".to_string(),
            creditor_name: Some("Shop".to_string()),
            reference: None,
        });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["consent_type"], "single_use");
        assert_eq!(value["amount"], "1500.00");
        assert!(value.get("reference").is_none());

        let parsed: PaymentConsentRequest = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_single_use_without_creditor_selected_by_missing_field() {
        let parsed: PaymentConsentRequest = serde_json::from_value(json!({
            "consent_type": "single_use",
            "requesting_bank": "team",
            "client_id": "team-2",
            "amount": "10.00",
            "debtor_account": "4081"
        }))
        .unwrap();

        assert!(matches!(parsed, PaymentConsentRequest::SingleUseWithoutCreditor(_)));
        assert_eq!(parsed.client_id(), "team-2");
    }

    #[test]
    fn test_multi_use_and_vrp_tags() {
        let multi: PaymentConsentRequest = serde_json::from_value(json!({
            "consent_type": "multi_use",
            "requesting_bank": "team",
            "client_id": "team-3",
            "debtor_account": "4081",
            "max_uses": 5,
            "max_amount_per_payment": "100",
            "valid_until": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(multi.consent_type(), "multi_use");
        assert!(matches!(multi, PaymentConsentRequest::MultiUse(ref m) if m.max_uses == 5));

        let vrp: PaymentConsentRequest = serde_json::from_value(json!({
            "consent_type": "vrp",
            "requesting_bank": "team",
            "client_id": "team-4",
            "debtor_account": "4081",
            "vrp_max_individual_amount": "500",
            "vrp_daily_limit": "1000",
            "vrp_monthly_limit": "10000"
        }))
        .unwrap();
        assert_eq!(vrp.consent_type(), "vrp");
        assert_eq!(vrp.debtor_account(), "4081");
    }

    #[test]
    fn test_unknown_consent_type_rejected() {
        let err = serde_json::from_value::<PaymentConsentRequest>(json!({
            "consent_type": "standing_order",
            "client_id": "x"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("standing_order"));

        assert!(serde_json::from_value::<PaymentConsentRequest>(json!({"client_id": "x"})).is_err());
    }

    #[test]
    fn test_wrap_initiation() {
        let wrapped = json!({ "data": { "initiation": { "instructedAmount": {} } } });
        assert_eq!(wrap_initiation(wrapped.clone()), wrapped);

        let data_only = json!({ "data": { "instructedAmount": { "amount": "1.00" } } });
        assert_eq!(
            wrap_initiation(data_only),
            json!({ "data": { "initiation": { "instructedAmount": { "amount": "1.00" } } } })
        );

        let bare = json!({ "instructedAmount": { "amount": "2.00" } });
        assert_eq!(
            wrap_initiation(bare),
            json!({ "data": { "initiation": { "instructedAmount": { "amount": "2.00" } } } })
        );
    }

    #[test]
    fn test_payment_status_response_parse() {
        let resp: PaymentStatusResponse = serde_json::from_value(json!({
            "data": { "paymentId": "p-1", "status": "AcceptedSettlementCompleted", "amount": "1.00" }
        }))
        .unwrap();
        assert_eq!(resp.data.payment_id.as_deref(), Some("p-1"));
        assert!(resp.data.extra.contains_key("amount"));
        assert!(resp.links.is_null());
    }
}
