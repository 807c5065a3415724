use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::aging::AgeRange;
use crate::claim::{Claim, ClaimStatus, DenialCode, PaymentMethod};
use crate::error::{ClaimError, ClaimResult};
use crate::money::Money;
use crate::policy::PayerCategory;

/// Lifecycle event applied to a claim through [`ClaimLedger::transition`].
#[derive(Debug, Clone)]
pub enum ClaimEvent {
    Submit,
    Accept,
    Deny {
        code: DenialCode,
        reason: String,
    },
    PostPayment {
        amount: Money,
        method: PaymentMethod,
    },
    Appeal {
        notes: String,
    },
    ResolveAppeal {
        outcome: AppealOutcome,
    },
}

impl ClaimEvent {
    pub fn label(&self) -> &'static str {
        match self {
            ClaimEvent::Submit => "submit",
            ClaimEvent::Accept => "accept",
            ClaimEvent::Deny { .. } => "deny",
            ClaimEvent::PostPayment { .. } => "post_payment",
            ClaimEvent::Appeal { .. } => "appeal",
            ClaimEvent::ResolveAppeal { .. } => "resolve_appeal",
        }
    }
}

/// How an appeal was resolved: the denial is either overturned, sending the
/// claim back to `Accepted`, or upheld with a fresh denial code.
#[derive(Debug, Clone)]
pub enum AppealOutcome {
    Overturned,
    Upheld { code: DenialCode, reason: String },
}

/// Append-only audit record written for every successful transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    pub claim_id: Uuid,
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub event: String,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
    pub actor: String,
}

/// A posted payment with its posting timestamp.
///
/// Revenue-in-window reporting reads these timestamps rather than the
/// claim's date of service, so cash is attributed to when it actually
/// arrived.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub claim_id: Uuid,
    pub amount: Money,
    pub method: PaymentMethod,
    pub posted_at: DateTime<Utc>,
}

/// Filter for [`ClaimLedger::query`]. Unset fields match everything; the
/// aging filter only matches claims with an outstanding balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimFilter {
    pub status: Option<ClaimStatus>,
    pub payer: Option<PayerCategory>,
    pub aging: Option<AgeRange>,
}

/// Read-only view of the ledger handed to the aging and KPI functions.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub claims: Vec<Claim>,
    pub payments: Vec<PaymentRecord>,
    pub taken_at: DateTime<Utc>,
}

/// The authoritative collection of all claims.
///
/// Each claim sits behind its own mutex so conflicting transitions on one
/// claim serialize while unrelated claims proceed in parallel. The outer
/// map lock is held shared for the duration of a transition, which lets
/// insert/discard wait out in-flight work instead of racing it. Claims are
/// never deleted once submitted; the transition log keeps the full history.
pub struct ClaimLedger {
    claims: RwLock<HashMap<Uuid, Arc<Mutex<Claim>>>>,
    transitions: Mutex<Vec<TransitionRecord>>,
    payments: Mutex<Vec<PaymentRecord>>,
    next_claim_number: AtomicU64,
}

impl Default for ClaimLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self {
            claims: RwLock::new(HashMap::new()),
            transitions: Mutex::new(Vec::new()),
            payments: Mutex::new(Vec::new()),
            next_claim_number: AtomicU64::new(1),
        }
    }

    /// Accept a built claim into the ledger, assigning its claim number.
    pub async fn insert(&self, mut claim: Claim) -> ClaimResult<Claim> {
        let mut claims = self.claims.write().await;
        if claims.contains_key(&claim.claim_id) {
            return Err(ClaimError::DuplicateClaim(claim.claim_id));
        }
        let number = self.next_claim_number.fetch_add(1, Ordering::SeqCst);
        claim.claim_number = Some(format!("CLM-{number:06}"));
        claims.insert(claim.claim_id, Arc::new(Mutex::new(claim.clone())));
        Ok(claim)
    }

    pub async fn get(&self, claim_id: Uuid) -> ClaimResult<Claim> {
        let claims = self.claims.read().await;
        let entry = claims
            .get(&claim_id)
            .ok_or(ClaimError::UnknownClaim(claim_id))?;
        Ok(entry.lock().await.clone())
    }

    pub async fn claim_count(&self) -> usize {
        self.claims.read().await.len()
    }

    /// Discard a claim that never left `Draft`. Submitted claims only move
    /// forward through the state machine and are never removed.
    pub async fn discard_draft(&self, claim_id: Uuid) -> ClaimResult<()> {
        let mut claims = self.claims.write().await;
        let entry = claims
            .get(&claim_id)
            .ok_or(ClaimError::UnknownClaim(claim_id))?;
        {
            let claim = entry.lock().await;
            if claim.status != ClaimStatus::Draft {
                return Err(ClaimError::InvalidStateTransition {
                    claim_id,
                    status: claim.status,
                    event: "discard",
                });
            }
        }
        claims.remove(&claim_id);
        Ok(())
    }

    /// Apply a lifecycle event to one claim.
    ///
    /// All-or-nothing: the next claim value is computed in full before
    /// anything is stored, so a failed precondition leaves the claim, the
    /// audit log, and the payment log untouched.
    pub async fn transition(
        &self,
        claim_id: Uuid,
        event: ClaimEvent,
        actor: &str,
    ) -> ClaimResult<Claim> {
        let claims = self.claims.read().await;
        let entry = claims
            .get(&claim_id)
            .ok_or(ClaimError::UnknownClaim(claim_id))?
            .clone();

        let mut claim = entry.lock().await;
        let from = claim.status;
        let applied = apply_event(&claim, event)?;

        *claim = applied.claim.clone();
        if let Some((amount, method)) = applied.payment {
            self.payments.lock().await.push(PaymentRecord {
                claim_id,
                amount,
                method,
                posted_at: Utc::now(),
            });
        }
        self.transitions.lock().await.push(TransitionRecord {
            claim_id,
            from,
            to: claim.status,
            event: applied.event.to_string(),
            detail: applied.detail,
            at: Utc::now(),
            actor: actor.to_string(),
        });
        Ok(applied.claim)
    }

    /// Claims matching the filter, ordered by claim number.
    pub async fn query(&self, filter: &ClaimFilter, as_of: NaiveDate) -> Vec<Claim> {
        let snapshot = self.snapshot().await;
        snapshot
            .claims
            .into_iter()
            .filter(|claim| {
                if let Some(status) = filter.status {
                    if claim.status != status {
                        return false;
                    }
                }
                if let Some(payer) = filter.payer {
                    if claim.payer != payer {
                        return false;
                    }
                }
                if let Some(range) = filter.aging {
                    if !claim.balance.is_positive() {
                        return false;
                    }
                    let age = (as_of - claim.date_of_service).num_days();
                    if AgeRange::from_days(age) != range {
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    /// Consistent read view for the aggregator: the map is held shared
    /// while every claim is copied out, then sorted by claim number so two
    /// snapshots of an unchanged ledger are identical.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        let claims_map = self.claims.read().await;
        let mut claims = Vec::with_capacity(claims_map.len());
        for entry in claims_map.values() {
            claims.push(entry.lock().await.clone());
        }
        drop(claims_map);
        claims.sort_by(|a, b| a.claim_number.cmp(&b.claim_number));

        let payments = self.payments.lock().await.clone();
        LedgerSnapshot {
            claims,
            payments,
            taken_at: Utc::now(),
        }
    }

    /// Full transition history for one claim, oldest first.
    pub async fn audit_trail(&self, claim_id: Uuid) -> Vec<TransitionRecord> {
        self.transitions
            .lock()
            .await
            .iter()
            .filter(|record| record.claim_id == claim_id)
            .cloned()
            .collect()
    }
}

struct Applied {
    claim: Claim,
    event: &'static str,
    detail: Option<String>,
    payment: Option<(Money, PaymentMethod)>,
}

/// The state machine. Computes the claim value after `event`, or fails
/// without side effects if the event is not valid from the current state.
fn apply_event(claim: &Claim, event: ClaimEvent) -> ClaimResult<Applied> {
    let label = event.label();
    let rejected = || ClaimError::InvalidStateTransition {
        claim_id: claim.claim_id,
        status: claim.status,
        event: label,
    };

    let mut next = claim.clone();
    let mut detail = None;
    let mut payment = None;

    match (claim.status, event) {
        (ClaimStatus::Draft, ClaimEvent::Submit) => {
            if !claim.eligibility_verified {
                return Err(ClaimError::EligibilityNotVerified);
            }
            next.status = ClaimStatus::Submitted;
        }
        (ClaimStatus::Submitted, ClaimEvent::Accept) => {
            // The insurer agreed to pay; funds are not posted yet
            next.status = ClaimStatus::Accepted;
        }
        (ClaimStatus::Submitted, ClaimEvent::Deny { code, reason }) => {
            next.status = ClaimStatus::Denied;
            next.denial_code = Some(code);
            detail = Some(format!("{code}: {reason}"));
            next.denial_reason = Some(reason);
        }
        (
            ClaimStatus::Accepted
            | ClaimStatus::PartialPayment
            | ClaimStatus::Denied
            | ClaimStatus::Paid,
            ClaimEvent::PostPayment { amount, method },
        ) => {
            // A denied claim has nothing collectible from the insurer; a
            // settled claim has zero balance and falls to the overpayment
            // check below
            if claim.status == ClaimStatus::Denied && !method.is_patient() {
                return Err(rejected());
            }
            if !amount.is_positive() {
                return Err(ClaimError::NegativeOrZeroAmount(amount));
            }
            if amount > claim.balance {
                return Err(ClaimError::OverpaymentRejected {
                    amount,
                    balance: claim.balance,
                });
            }
            next.paid_amount += amount;
            next.balance -= amount;
            next.status = if next.balance.is_zero() {
                ClaimStatus::Paid
            } else {
                ClaimStatus::PartialPayment
            };
            detail = Some(format!("{amount}"));
            payment = Some((amount, method));
        }
        (ClaimStatus::Denied, ClaimEvent::Appeal { notes }) => {
            if claim.denial_code.is_none() {
                return Err(ClaimError::MissingDenialCode);
            }
            next.status = ClaimStatus::Appeal;
            detail = Some(notes);
        }
        (ClaimStatus::Appeal, ClaimEvent::ResolveAppeal { outcome }) => match outcome {
            AppealOutcome::Overturned => {
                next.status = ClaimStatus::Accepted;
                next.denial_code = None;
                next.denial_reason = None;
                detail = Some("overturned".to_string());
            }
            AppealOutcome::Upheld { code, reason } => {
                next.status = ClaimStatus::Denied;
                next.denial_code = Some(code);
                detail = Some(format!("upheld, {code}: {reason}"));
                next.denial_reason = Some(reason);
            }
        },
        (_, _) => return Err(rejected()),
    }

    Ok(Applied {
        claim: next,
        event: label,
        detail,
        payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, build_claim};
    use crate::catalog::ProcedureCatalog;
    use crate::policy::PayerPolicyTable;
    use crate::schema::{RequestLine, mock_request};

    async fn inserted_claim(ledger: &ClaimLedger) -> Claim {
        let claim = build_claim(
            &ProcedureCatalog::standard(),
            &PayerPolicyTable::standard(),
            &mock_request(),
            &BuildOptions::default(),
        )
        .expect("mock claim builds");
        ledger.insert(claim).await.expect("insert succeeds")
    }

    async fn submitted_claim(ledger: &ClaimLedger) -> Claim {
        let claim = inserted_claim(ledger).await;
        ledger
            .transition(claim.claim_id, ClaimEvent::Submit, "test")
            .await
            .expect("submit succeeds")
    }

    #[tokio::test]
    async fn test_insert_assigns_monotonic_claim_numbers() {
        let ledger = ClaimLedger::new();
        let first = inserted_claim(&ledger).await;
        let second = inserted_claim(&ledger).await;

        assert_eq!(first.claim_number.as_deref(), Some("CLM-000001"));
        assert_eq!(second.claim_number.as_deref(), Some("CLM-000002"));
        assert_eq!(ledger.claim_count().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let ledger = ClaimLedger::new();
        let claim = inserted_claim(&ledger).await;
        let err = ledger.insert(claim.clone()).await.unwrap_err();
        assert_eq!(err, ClaimError::DuplicateClaim(claim.claim_id));
    }

    #[tokio::test]
    async fn test_submit_requires_verified_eligibility() {
        let ledger = ClaimLedger::new();
        let mut request = mock_request();
        request.eligibility_verified = false;
        let claim = build_claim(
            &ProcedureCatalog::standard(),
            &PayerPolicyTable::standard(),
            &request,
            &BuildOptions::default(),
        )
        .unwrap();
        let claim = ledger.insert(claim).await.unwrap();

        let err = ledger
            .transition(claim.claim_id, ClaimEvent::Submit, "test")
            .await
            .unwrap_err();
        assert_eq!(err, ClaimError::EligibilityNotVerified);

        // the stored claim is unchanged
        let stored = ledger.get(claim.claim_id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Draft);
    }

    /// Full happy path: submit, accept, pay in full.
    /// Expected: status Paid, balance zero, both payments recorded.
    #[tokio::test]
    async fn test_accept_and_pay_in_full() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;

        let claim = ledger
            .transition(claim.claim_id, ClaimEvent::Accept, "test")
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Accepted);
        assert_eq!(claim.balance, claim.net_charges);

        let claim = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: claim.insurance_payment,
                    method: PaymentMethod::InsurerRemittance,
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::PartialPayment);
        assert_eq!(claim.balance, claim.patient_responsibility);

        let claim = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: claim.balance,
                    method: PaymentMethod::PatientCard,
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Paid);
        assert_eq!(claim.balance, Money::ZERO);
        assert_eq!(claim.paid_amount, claim.net_charges);

        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.payments.len(), 2);
    }

    /// Posting a full payment settles the claim; one more cent is an
    /// overpayment and must be rejected.
    #[tokio::test]
    async fn test_overpayment_rejected_after_settlement() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(claim.claim_id, ClaimEvent::Accept, "test")
            .await
            .unwrap();

        let paid = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: Money::from_dollars(108.00),
                    method: PaymentMethod::InsurerRemittance,
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(paid.status, ClaimStatus::Paid);
        assert_eq!(paid.balance, Money::ZERO);

        let err = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: Money::from_cents(1),
                    method: PaymentMethod::PatientCash,
                },
                "test",
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClaimError::OverpaymentRejected {
                amount: Money::from_cents(1),
                balance: Money::ZERO,
            }
        );
    }

    #[tokio::test]
    async fn test_partial_overpayment_rejected_with_balance() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(claim.claim_id, ClaimEvent::Accept, "test")
            .await
            .unwrap();

        let err = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: Money::from_dollars(108.01),
                    method: PaymentMethod::InsurerRemittance,
                },
                "test",
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClaimError::OverpaymentRejected {
                amount: Money::from_dollars(108.01),
                balance: Money::from_dollars(108.00),
            }
        );

        let stored = ledger.get(claim.claim_id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Accepted);
        assert_eq!(stored.paid_amount, Money::ZERO);
    }

    #[tokio::test]
    async fn test_zero_payment_rejected() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(claim.claim_id, ClaimEvent::Accept, "test")
            .await
            .unwrap();

        let err = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: Money::ZERO,
                    method: PaymentMethod::PatientCash,
                },
                "test",
            )
            .await
            .unwrap_err();
        assert_eq!(err, ClaimError::NegativeOrZeroAmount(Money::ZERO));
    }

    /// Denial keeps the full balance outstanding; appeal and resolution
    /// move the status without touching the money.
    #[tokio::test]
    async fn test_deny_appeal_resolve_cycle() {
        let ledger = ClaimLedger::new();
        let mut request = mock_request();
        request.payer = crate::policy::PayerCategory::SelfPay;
        request.lines = vec![RequestLine {
            procedure_code: "93452".to_string(),
            quantity: 1,
        }];
        let claim = build_claim(
            &ProcedureCatalog::standard(),
            &PayerPolicyTable::standard(),
            &request,
            &BuildOptions::default(),
        )
        .unwrap();
        let claim = ledger.insert(claim).await.unwrap();
        assert_eq!(claim.net_charges, Money::from_dollars(8372.50));
        ledger
            .transition(claim.claim_id, ClaimEvent::Submit, "test")
            .await
            .unwrap();

        let denied = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Deny {
                    code: DenialCode::Co(50),
                    reason: "Non-covered service".to_string(),
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(denied.status, ClaimStatus::Denied);
        assert_eq!(denied.denial_code, Some(DenialCode::Co(50)));
        assert_eq!(denied.balance, Money::from_dollars(8372.50));

        let appealed = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Appeal {
                    notes: "additional documentation attached".to_string(),
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(appealed.status, ClaimStatus::Appeal);

        let resolved = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::ResolveAppeal {
                    outcome: AppealOutcome::Overturned,
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(resolved.status, ClaimStatus::Accepted);
        assert_eq!(resolved.balance, Money::from_dollars(8372.50));
        assert_eq!(resolved.denial_code, None);
    }

    /// An appeal can be denied again; the cycle is bounded by business
    /// process, not by the engine.
    #[tokio::test]
    async fn test_appeal_upheld_denies_again() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Deny {
                    code: DenialCode::Co(97),
                    reason: "Bundled service".to_string(),
                },
                "test",
            )
            .await
            .unwrap();
        ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Appeal {
                    notes: "resubmitting with modifier".to_string(),
                },
                "test",
            )
            .await
            .unwrap();

        let upheld = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::ResolveAppeal {
                    outcome: AppealOutcome::Upheld {
                        code: DenialCode::Oa(23),
                        reason: "Prior payer adjudicated".to_string(),
                    },
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(upheld.status, ClaimStatus::Denied);
        assert_eq!(upheld.denial_code, Some(DenialCode::Oa(23)));

        // and the claim can go around again
        let again = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Appeal {
                    notes: "second appeal".to_string(),
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(again.status, ClaimStatus::Appeal);
    }

    /// A denied claim accepts patient payments but not insurer money.
    #[tokio::test]
    async fn test_denied_claim_takes_patient_payment_only() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Deny {
                    code: DenialCode::Pr(1),
                    reason: "Deductible".to_string(),
                },
                "test",
            )
            .await
            .unwrap();

        let err = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: Money::from_dollars(10.00),
                    method: PaymentMethod::InsurerRemittance,
                },
                "test",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidStateTransition { .. }));

        let partial = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::PostPayment {
                    amount: Money::from_dollars(10.00),
                    method: PaymentMethod::PatientCheck,
                },
                "test",
            )
            .await
            .unwrap();
        assert_eq!(partial.status, ClaimStatus::PartialPayment);
        assert_eq!(partial.balance, Money::from_dollars(98.00));
    }

    /// State-machine closure: events invalid for the current state fail
    /// with InvalidStateTransition and leave the stored claim untouched.
    #[tokio::test]
    async fn test_invalid_transitions_leave_claim_unchanged() {
        let ledger = ClaimLedger::new();
        let claim = inserted_claim(&ledger).await;
        let before = ledger.get(claim.claim_id).await.unwrap();

        let invalid_events = [
            ClaimEvent::Accept,
            ClaimEvent::Deny {
                code: DenialCode::Co(45),
                reason: "n/a".to_string(),
            },
            ClaimEvent::PostPayment {
                amount: Money::from_dollars(1.00),
                method: PaymentMethod::PatientCash,
            },
            ClaimEvent::Appeal {
                notes: "n/a".to_string(),
            },
            ClaimEvent::ResolveAppeal {
                outcome: AppealOutcome::Overturned,
            },
        ];
        for event in invalid_events {
            let err = ledger
                .transition(claim.claim_id, event, "test")
                .await
                .unwrap_err();
            assert!(matches!(err, ClaimError::InvalidStateTransition { .. }));
        }

        let after = ledger.get(claim.claim_id).await.unwrap();
        assert_eq!(before, after);
        assert!(ledger.audit_trail(claim.claim_id).await.is_empty());
    }

    /// A claim recorded as denied by an upstream system but missing its
    /// denial code cannot be appealed.
    #[tokio::test]
    async fn test_appeal_requires_denial_code() {
        let ledger = ClaimLedger::new();
        let mut claim = build_claim(
            &ProcedureCatalog::standard(),
            &PayerPolicyTable::standard(),
            &mock_request(),
            &BuildOptions::default(),
        )
        .unwrap();
        claim.status = ClaimStatus::Denied;
        let claim = ledger.insert(claim).await.unwrap();

        let err = ledger
            .transition(
                claim.claim_id,
                ClaimEvent::Appeal {
                    notes: "no code on file".to_string(),
                },
                "test",
            )
            .await
            .unwrap_err();
        assert_eq!(err, ClaimError::MissingDenialCode);
    }

    #[tokio::test]
    async fn test_unknown_claim() {
        let ledger = ClaimLedger::new();
        let missing = Uuid::new_v4();
        let err = ledger
            .transition(missing, ClaimEvent::Submit, "test")
            .await
            .unwrap_err();
        assert_eq!(err, ClaimError::UnknownClaim(missing));
    }

    #[tokio::test]
    async fn test_discard_draft_only() {
        let ledger = ClaimLedger::new();
        let draft = inserted_claim(&ledger).await;
        ledger.discard_draft(draft.claim_id).await.unwrap();
        assert_eq!(ledger.claim_count().await, 0);

        let submitted = submitted_claim(&ledger).await;
        let err = ledger.discard_draft(submitted.claim_id).await.unwrap_err();
        assert_eq!(
            err,
            ClaimError::InvalidStateTransition {
                claim_id: submitted.claim_id,
                status: ClaimStatus::Submitted,
                event: "discard",
            }
        );
        assert_eq!(ledger.claim_count().await, 1);
    }

    /// Every successful transition appends to the audit trail with the
    /// states on both sides; failures append nothing.
    #[tokio::test]
    async fn test_audit_trail_records_transitions() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(claim.claim_id, ClaimEvent::Accept, "adjudicator")
            .await
            .unwrap();

        let trail = ledger.audit_trail(claim.claim_id).await;
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].from, ClaimStatus::Draft);
        assert_eq!(trail[0].to, ClaimStatus::Submitted);
        assert_eq!(trail[0].event, "submit");
        assert_eq!(trail[0].actor, "test");
        assert_eq!(trail[1].from, ClaimStatus::Submitted);
        assert_eq!(trail[1].to, ClaimStatus::Accepted);
        assert_eq!(trail[1].actor, "adjudicator");
    }

    #[tokio::test]
    async fn test_query_by_status_and_payer() {
        let ledger = ClaimLedger::new();
        let first = submitted_claim(&ledger).await;
        let _second = inserted_claim(&ledger).await;

        let as_of = first.date_of_service;
        let submitted = ledger
            .query(
                &ClaimFilter {
                    status: Some(ClaimStatus::Submitted),
                    ..Default::default()
                },
                as_of,
            )
            .await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].claim_id, first.claim_id);

        let medicare = ledger
            .query(
                &ClaimFilter {
                    payer: Some(PayerCategory::Medicare),
                    ..Default::default()
                },
                as_of,
            )
            .await;
        assert_eq!(medicare.len(), 2);

        let none = ledger
            .query(
                &ClaimFilter {
                    payer: Some(PayerCategory::Commercial),
                    ..Default::default()
                },
                as_of,
            )
            .await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_query_by_aging_bucket() {
        let ledger = ClaimLedger::new();
        let claim = submitted_claim(&ledger).await;
        let as_of = claim.date_of_service + chrono::Duration::days(45);

        let bucket = ledger
            .query(
                &ClaimFilter {
                    aging: Some(AgeRange::ThirtyOneToSixty),
                    ..Default::default()
                },
                as_of,
            )
            .await;
        assert_eq!(bucket.len(), 1);

        let other = ledger
            .query(
                &ClaimFilter {
                    aging: Some(AgeRange::OverNinety),
                    ..Default::default()
                },
                as_of,
            )
            .await;
        assert!(other.is_empty());
    }

    /// Two tasks race to post the full balance; per-claim locking means
    /// exactly one wins and the other is rejected as an overpayment.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_payments_serialize() {
        let ledger = Arc::new(ClaimLedger::new());
        let claim = submitted_claim(&ledger).await;
        ledger
            .transition(claim.claim_id, ClaimEvent::Accept, "test")
            .await
            .unwrap();
        let balance = claim.net_charges;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let ledger = ledger.clone();
            let claim_id = claim.claim_id;
            handles.push(tokio::spawn(async move {
                ledger
                    .transition(
                        claim_id,
                        ClaimEvent::PostPayment {
                            amount: balance,
                            method: PaymentMethod::InsurerRemittance,
                        },
                        "race",
                    )
                    .await
            }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.expect("task completes") {
                Ok(_) => ok += 1,
                Err(ClaimError::InvalidStateTransition { .. })
                | Err(ClaimError::OverpaymentRejected { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(rejected, 1);

        let stored = ledger.get(claim.claim_id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Paid);
        assert_eq!(stored.balance, Money::ZERO);
        assert_eq!(ledger.snapshot().await.payments.len(), 1);
    }
}
