use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::policy::PayerCategory;

/// One `(procedure code, quantity)` line on an intake request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLine {
    pub procedure_code: String,
    pub quantity: u32,
}

/// The intake wire record for a claim, one JSON object per line.
///
/// Prices are not part of the record; they come from the procedure catalog
/// when the claim is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub patient_id: String,
    pub date_of_service: NaiveDate,
    pub payer: PayerCategory,
    pub lines: Vec<RequestLine>,
    #[serde(default)]
    pub eligibility_verified: bool,
    #[serde(default)]
    pub prior_authorization: Option<String>,
}

/// Mock request for testing
#[cfg(test)]
pub fn mock_request() -> ClaimRequest {
    ClaimRequest {
        patient_id: "PT-00042".to_string(),
        date_of_service: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
        payer: PayerCategory::Medicare,
        lines: vec![RequestLine {
            procedure_code: "99213".to_string(),
            quantity: 1,
        }],
        eligibility_verified: true,
        prior_authorization: None,
    }
}
