//! Defensive parsing of model output into structured bill data.
//!
//! VLM replies are untrusted free text that usually, but not always,
//! contains one JSON object. Everything here is pure so the weird cases
//! are unit-testable without a live backend.

use serde_json::Value;

use crate::models::{ExtractedBillData, InsightResponse, LineItem, RiskLevel};

/// A parsed scan reply: the normalized bill data plus the two
/// scan-only fields the model reports alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScan {
    pub data: ExtractedBillData,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

/// Locate the JSON object embedded in raw model text.
///
/// Greedy: takes the substring from the first `{` to the last `}`.
/// This mis-parses replies with trailing JSON-like text after the real
/// object; kept as-is because a stricter balanced parser would change
/// behavior on malformed replies some models produce (see DESIGN.md).
pub fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Coerce a JSON value to a number the way `Number(x) || 0` would:
/// numbers pass through, numeric strings parse, everything else is 0.
fn as_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Coerce a JSON value to a string: strings pass through, numbers are
/// formatted, everything else is the empty string.
fn as_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn as_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

/// Line items with non-positive amounts are noise (section headers,
/// subtotal echoes) and are dropped, preserving relative order.
fn as_line_items(value: Option<&Value>) -> Vec<LineItem> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| LineItem {
                description: as_string(item.get("description")),
                amount: as_number(item.get("amount")),
            })
            .filter(|item| item.amount > 0.0)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a raw model reply into normalized bill data.
///
/// Returns `None` when no JSON object can be located or parsed — the
/// caller fails the scan with confidence 0 and does not retry, since
/// unparseable output is a capability limitation, not a transient fault.
pub fn parse_bill_data(raw: &str) -> Option<ParsedScan> {
    let block = extract_json_block(raw)?;
    let value: Value = serde_json::from_str(block).ok()?;
    let obj = value.as_object()?;

    let data = ExtractedBillData {
        consumer_number: as_string(obj.get("consumerNumber")),
        meter_number: as_string(obj.get("meterNumber")),
        bill_date: as_string(obj.get("billDate")),
        due_date: as_string(obj.get("dueDate")),
        billing_period: as_string(obj.get("billingPeriod")),
        units_consumed: as_number(obj.get("unitsConsumed")),
        previous_reading: as_number(obj.get("previousReading")),
        current_reading: as_number(obj.get("currentReading")),
        max_demand: as_number(obj.get("maxDemand")),
        power_factor: as_number(obj.get("powerFactor")),
        sanctioned_load: as_number(obj.get("sanctionedLoad")),
        contract_demand: as_number(obj.get("contractDemand")),
        utility_provider: as_string(obj.get("utilityProvider")),
        tariff_category: as_string(obj.get("tariffCategory")),
        address: as_string(obj.get("address")),
        total_amount: as_number(obj.get("totalAmount")),
        line_items: as_line_items(obj.get("lineItems")),
    };

    let confidence = match obj.get("confidence") {
        Some(v) => as_number(Some(v)).clamp(0.0, 1.0),
        None => 0.5,
    };

    Some(ParsedScan {
        data,
        confidence,
        warnings: as_string_list(obj.get("warnings")),
    })
}

/// Parse a model's insight reply. Lenient for the same reasons as
/// [`parse_bill_data`]; the caller substitutes the heuristic on `None`.
pub fn parse_insight_response(raw: &str) -> Option<InsightResponse> {
    let block = extract_json_block(raw)?;
    let value: Value = serde_json::from_str(block).ok()?;
    let obj = value.as_object()?;

    let risk_level = match as_string(obj.get("riskLevel")).to_lowercase().as_str() {
        "high" => RiskLevel::High,
        "medium" => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };

    Some(InsightResponse {
        summary: as_string(obj.get("summary")),
        insights: as_string_list(obj.get("insights")),
        recommendations: as_string_list(obj.get("recommendations")),
        potential_savings: as_number(obj.get("potentialSavings")),
        risk_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_block_strips_prose() {
        let raw = "Here is the data:\n{\"a\": 1}\nLet me know!";
        assert_eq!(extract_json_block(raw), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_block_is_greedy_to_last_brace() {
        // Documented behavior: trailing JSON-like text is swallowed.
        let raw = "{\"a\": 1} and also {\"b\": 2}";
        assert_eq!(extract_json_block(raw), Some("{\"a\": 1} and also {\"b\": 2}"));
    }

    #[test]
    fn test_extract_block_none_without_object() {
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("} backwards {"), None);
    }

    #[test]
    fn test_missing_fields_default_for_every_field() {
        let parsed = parse_bill_data("{}").unwrap();
        assert_eq!(parsed.data, ExtractedBillData::default());
        assert_eq!(parsed.data.consumer_number, "");
        assert_eq!(parsed.data.meter_number, "");
        assert_eq!(parsed.data.bill_date, "");
        assert_eq!(parsed.data.due_date, "");
        assert_eq!(parsed.data.billing_period, "");
        assert_eq!(parsed.data.units_consumed, 0.0);
        assert_eq!(parsed.data.previous_reading, 0.0);
        assert_eq!(parsed.data.current_reading, 0.0);
        assert_eq!(parsed.data.max_demand, 0.0);
        assert_eq!(parsed.data.power_factor, 0.0);
        assert_eq!(parsed.data.sanctioned_load, 0.0);
        assert_eq!(parsed.data.contract_demand, 0.0);
        assert_eq!(parsed.data.utility_provider, "");
        assert_eq!(parsed.data.tariff_category, "");
        assert_eq!(parsed.data.address, "");
        assert_eq!(parsed.data.total_amount, 0.0);
        assert!(parsed.data.line_items.is_empty());
        assert_eq!(parsed.confidence, 0.5);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_unparseable_values_coerce_to_defaults() {
        let raw = r#"{
            "totalAmount": "not a number",
            "unitsConsumed": null,
            "consumerNumber": {"nested": true},
            "powerFactor": "0.85"
        }"#;
        let parsed = parse_bill_data(raw).unwrap();
        assert_eq!(parsed.data.total_amount, 0.0);
        assert_eq!(parsed.data.units_consumed, 0.0);
        assert_eq!(parsed.data.consumer_number, "");
        assert_eq!(parsed.data.power_factor, 0.85);
    }

    #[test]
    fn test_numeric_consumer_number_is_stringified() {
        let parsed = parse_bill_data(r#"{"consumerNumber": 123456}"#).unwrap();
        assert_eq!(parsed.data.consumer_number, "123456");
    }

    #[test]
    fn test_line_items_keep_only_positive_amounts_in_order() {
        let raw = r#"{"lineItems": [
            {"description": "Energy charge", "amount": 3200},
            {"description": "Header", "amount": 0},
            {"description": "Rebate", "amount": -120},
            {"description": "Fixed charge", "amount": 150},
            {"description": "Duty", "amount": "80"}
        ]}"#;
        let parsed = parse_bill_data(raw).unwrap();
        let descriptions: Vec<&str> = parsed
            .data
            .line_items
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["Energy charge", "Fixed charge", "Duty"]);
        assert_eq!(parsed.data.line_items[2].amount, 80.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let parsed = parse_bill_data(r#"{"confidence": 1.7}"#).unwrap();
        assert_eq!(parsed.confidence, 1.0);
        let parsed = parse_bill_data(r#"{"confidence": -0.3}"#).unwrap();
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn test_parse_failure_returns_none() {
        assert!(parse_bill_data("I could not read the bill, sorry.").is_none());
        assert!(parse_bill_data("{ definitely not json }").is_none());
        // A bare array is not the object contract.
        assert!(parse_bill_data("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_parse_full_reply_with_prose() {
        let raw = r#"Sure! Here is the extraction:
        {"consumerNumber": "CA-1029", "totalAmount": 4500, "unitsConsumed": 320,
         "powerFactor": 0.82, "confidence": 0.9, "warnings": ["due date unclear"]}
        Hope that helps."#;
        let parsed = parse_bill_data(raw).unwrap();
        assert_eq!(parsed.data.consumer_number, "CA-1029");
        assert_eq!(parsed.data.total_amount, 4500.0);
        assert_eq!(parsed.data.units_consumed, 320.0);
        assert_eq!(parsed.data.power_factor, 0.82);
        assert_eq!(parsed.confidence, 0.9);
        assert_eq!(parsed.warnings, vec!["due date unclear"]);
    }

    #[test]
    fn test_parse_insight_response() {
        let raw = r#"{"summary": "High usage", "insights": ["a", "b"],
            "recommendations": ["c"], "potentialSavings": 300, "riskLevel": "medium"}"#;
        let insights = parse_insight_response(raw).unwrap();
        assert_eq!(insights.summary, "High usage");
        assert_eq!(insights.risk_level, crate::models::RiskLevel::Medium);
        assert_eq!(insights.potential_savings, 300.0);
    }

    #[test]
    fn test_parse_insight_unknown_risk_defaults_low() {
        let insights = parse_insight_response(r#"{"riskLevel": "catastrophic"}"#).unwrap();
        assert_eq!(insights.risk_level, crate::models::RiskLevel::Low);
    }
}
