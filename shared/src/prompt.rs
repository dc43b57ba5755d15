//! Prompt contract shared by both VLM backends.
//!
//! Both adapters send the same instructions so their replies normalize
//! through the same parser. The model must answer with exactly one JSON
//! object; prose around it is tolerated by the parser but discouraged
//! by the prompt.

use crate::models::ExtractedBillData;

const EXTRACTION_SCHEMA: &str = r#"{
  "consumerNumber": "",
  "meterNumber": "",
  "billDate": "",
  "dueDate": "",
  "billingPeriod": "",
  "unitsConsumed": 0,
  "previousReading": 0,
  "currentReading": 0,
  "maxDemand": 0,
  "powerFactor": 0,
  "sanctionedLoad": 0,
  "contractDemand": 0,
  "utilityProvider": "",
  "tariffCategory": "",
  "address": "",
  "totalAmount": 0,
  "lineItems": [{"description": "", "amount": 0}],
  "confidence": 0.0,
  "warnings": []
}"#;

/// Extraction prompt for vision input (the bill is attached as an image).
pub fn extraction_prompt() -> String {
    format!(
        "You are an expert at reading electricity bills. Extract the fields from \
         the attached bill document and respond with EXACTLY ONE JSON object in this \
         shape, nothing else:\n{EXTRACTION_SCHEMA}\n\
         Every field is required. Use 0 for numbers and \"\" for strings you cannot \
         read. Set confidence between 0 and 1 for how reliable the extraction is, \
         and list anything ambiguous in warnings."
    )
}

/// Extraction prompt for plain-text input (the bill text is inlined).
pub fn extraction_prompt_for_text(bill_text: &str) -> String {
    format!(
        "{}\n\nBill text:\n{}",
        extraction_prompt(),
        bill_text
    )
}

/// Text-only prompt asking for savings insights over extracted data.
pub fn insight_prompt(data: &ExtractedBillData) -> String {
    format!(
        "You are an energy efficiency advisor. Analyze this electricity bill and \
         respond with EXACTLY ONE JSON object shaped like \
         {{\"summary\": \"\", \"insights\": [], \"recommendations\": [], \
         \"potentialSavings\": 0, \"riskLevel\": \"low|medium|high\"}}.\n\
         Bill: total amount {:.2}, units consumed {:.1} kWh, power factor {:.2}, \
         max demand {:.1} kW, sanctioned load {:.1} kW, tariff category \"{}\", \
         utility \"{}\", billing period \"{}\".",
        data.total_amount,
        data.units_consumed,
        data.power_factor,
        data.max_demand,
        data.sanctioned_load,
        data.tariff_category,
        data.utility_provider,
        data.billing_period
    )
}
