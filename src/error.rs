use uuid::Uuid;

use crate::claim::ClaimStatus;
use crate::money::Money;
use crate::policy::PayerCategory;

pub type ClaimResult<T> = std::result::Result<T, ClaimError>;

/// Validation and state-machine failures surfaced by the engine.
///
/// Every kind is detected before any mutation happens, so a failed call
/// leaves the ledger untouched and the caller can retry with corrected
/// input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClaimError {
    #[error("unknown procedure code: {0}")]
    UnknownProcedureCode(String),
    #[error("invalid quantity {quantity} for procedure {code}: must be at least 1")]
    InvalidQuantity { code: String, quantity: u32 },
    #[error("claim has no billable line items")]
    EmptyClaim,
    #[error("no payer policy configured for {0}")]
    MissingPayerPolicy(PayerCategory),
    #[error("rate {0} is out of range: must be within [0, 1]")]
    InvalidRate(f64),
    #[error("eligibility has not been verified for this claim")]
    EligibilityNotVerified,
    #[error("claim {claim_id}: cannot {event} while {status}")]
    InvalidStateTransition {
        claim_id: Uuid,
        status: ClaimStatus,
        event: &'static str,
    },
    #[error("cannot post payment of {amount} exceeding balance of {balance}")]
    OverpaymentRejected { amount: Money, balance: Money },
    #[error("amount {0} must be positive")]
    NegativeOrZeroAmount(Money),
    #[error("appeal requires a denial code on the claim")]
    MissingDenialCode,
    #[error("invalid denial code {0:?}: expected a CO-, PR-, or OA- code")]
    InvalidDenialCode(String),
    #[error("unknown claim: {0}")]
    UnknownClaim(Uuid),
    #[error("claim {0} already exists in the ledger")]
    DuplicateClaim(Uuid),
    #[error("duplicate procedure code in catalog: {0}")]
    DuplicateProcedureCode(String),
}
