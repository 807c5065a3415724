use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClaimError;
use crate::money::Money;
use crate::policy::PayerCategory;

/// One billed procedure on a claim, owned exclusively by that claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimLineItem {
    pub procedure_code: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub extended_price: Money,
}

/// Closed denial-code taxonomy: contractual obligation (CO), patient
/// responsibility (PR), and other adjustment (OA) codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DenialCode {
    Co(u16),
    Pr(u16),
    Oa(u16),
}

impl DenialCode {
    pub fn group(&self) -> &'static str {
        match self {
            DenialCode::Co(_) => "CO",
            DenialCode::Pr(_) => "PR",
            DenialCode::Oa(_) => "OA",
        }
    }
}

impl fmt::Display for DenialCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (group, number) = match self {
            DenialCode::Co(n) => ("CO", n),
            DenialCode::Pr(n) => ("PR", n),
            DenialCode::Oa(n) => ("OA", n),
        };
        write!(f, "{group}-{number}")
    }
}

impl FromStr for DenialCode {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClaimError::InvalidDenialCode(s.to_string());
        let (group, number) = s.split_once('-').ok_or_else(invalid)?;
        let number: u16 = number.parse().map_err(|_| invalid())?;
        match group {
            "CO" => Ok(DenialCode::Co(number)),
            "PR" => Ok(DenialCode::Pr(number)),
            "OA" => Ok(DenialCode::Oa(number)),
            _ => Err(invalid()),
        }
    }
}

impl From<DenialCode> for String {
    fn from(code: DenialCode) -> String {
        code.to_string()
    }
}

impl TryFrom<String> for DenialCode {
    type Error = ClaimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// How a posted payment arrived. Denied claims only accept patient-side
/// payments; the insurer has refused to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    InsurerRemittance,
    PatientCard,
    PatientCash,
    PatientCheck,
}

impl PaymentMethod {
    pub fn is_patient(&self) -> bool {
        !matches!(self, PaymentMethod::InsurerRemittance)
    }
}

/// Claim lifecycle state.
///
/// `Draft -> Submitted -> {Accepted, Denied}`;
/// `Accepted -> {Paid, PartialPayment}`; `PartialPayment -> Paid`;
/// `Denied -> Appeal -> {Accepted, Denied}`. `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Draft,
    Submitted,
    Accepted,
    Denied,
    Appeal,
    PartialPayment,
    Paid,
}

impl ClaimStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStatus::Paid)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ClaimStatus::Draft => "draft",
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Accepted => "accepted",
            ClaimStatus::Denied => "denied",
            ClaimStatus::Appeal => "appeal",
            ClaimStatus::PartialPayment => "partial_payment",
            ClaimStatus::Paid => "paid",
        };
        write!(f, "{label}")
    }
}

/// A claim with its full financial breakdown.
///
/// Built by the claim builder in `Draft` status and thereafter mutated only
/// through ledger transitions. Invariants maintained throughout the
/// lifecycle:
/// `net_charges = gross_charges - contractual_allowance - discount`,
/// `net_charges = insurance_payment + patient_responsibility`,
/// `balance = net_charges - paid_amount`, and `balance >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: Uuid,
    /// Human-readable monotonic number, assigned when the ledger accepts
    /// the claim.
    pub claim_number: Option<String>,
    pub patient_id: String,
    pub date_of_service: NaiveDate,
    pub payer: PayerCategory,
    pub line_items: Vec<ClaimLineItem>,
    pub status: ClaimStatus,
    pub gross_charges: Money,
    pub contractual_allowance: Money,
    pub discount: Money,
    pub net_charges: Money,
    pub patient_responsibility: Money,
    pub insurance_payment: Money,
    pub paid_amount: Money,
    pub balance: Money,
    pub denial_code: Option<DenialCode>,
    pub denial_reason: Option<String>,
    pub prior_authorization: Option<String>,
    pub eligibility_verified: bool,
}
