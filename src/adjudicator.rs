use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::sync::mpsc::Receiver;
use tokio::time::sleep;

use crate::claim::{ClaimStatus, DenialCode, PaymentMethod};
use crate::error::ClaimResult;
use crate::ledger::{ClaimEvent, ClaimLedger};
use crate::logging::log_claim_event;
use crate::message::{AdjudicationEnvelope, AdjudicatorMessage, DispositionMessage};
use crate::money::Money;

/// Denial reasons the simulated payer draws from.
const DENIALS: [(DenialCode, &str); 6] = [
    (DenialCode::Co(45), "Charge exceeds fee schedule"),
    (DenialCode::Co(50), "Non-covered service"),
    (DenialCode::Co(97), "Bundled into another service"),
    (DenialCode::Pr(1), "Deductible amount"),
    (DenialCode::Pr(204), "Service not covered under patient plan"),
    (DenialCode::Oa(23), "Impact of prior payer adjudication"),
];

#[derive(Debug, Clone)]
enum Decision {
    Approve { split_remittance: bool },
    Deny { code: DenialCode, reason: String },
}

/// Simulated payer-side adjudication task.
///
/// Claims arrive over the `AdjudicatorMessage` channel; after a random
/// bounded delay each is either accepted and paid down through ledger
/// transitions, or denied with a code from the standard taxonomy. The
/// disposition is reported back on the envelope's response channel.
pub struct Adjudicator {
    ledger: Arc<ClaimLedger>,
    min_response_time_secs: u64,
    max_response_time_secs: u64,
    approval_rate: f64,
    rx: Receiver<AdjudicatorMessage>,
    verbose: bool,
}

impl Adjudicator {
    pub fn new(
        ledger: Arc<ClaimLedger>,
        min_response_time_secs: u64,
        max_response_time_secs: u64,
        approval_rate: f64,
        rx: Receiver<AdjudicatorMessage>,
        verbose: bool,
    ) -> Self {
        Self {
            ledger,
            min_response_time_secs,
            max_response_time_secs,
            approval_rate: approval_rate.clamp(0.0, 1.0),
            rx,
            verbose,
        }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let AdjudicatorMessage::Adjudicate(envelope) = msg;
            // Sample every random choice before the task is spawned
            let (delay, decision) = self.draw_decision();
            let ledger = self.ledger.clone();
            let verbose = self.verbose;
            tokio::spawn(async move {
                sleep(delay).await;
                settle_claim(ledger, envelope, decision, verbose).await;
            });
        }
    }

    fn draw_decision(&self) -> (Duration, Decision) {
        let mut rng = rand::rng();
        let secs = rng.random_range(self.min_response_time_secs..=self.max_response_time_secs);
        let decision = if rng.random_bool(self.approval_rate) {
            Decision::Approve {
                split_remittance: rng.random_bool(0.3),
            }
        } else {
            let (code, reason) = DENIALS.choose(&mut rng).expect("denial list is not empty");
            Decision::Deny {
                code: *code,
                reason: reason.to_string(),
            }
        };
        (Duration::from_secs(secs), decision)
    }
}

async fn settle_claim(
    ledger: Arc<ClaimLedger>,
    envelope: AdjudicationEnvelope,
    decision: Decision,
    verbose: bool,
) {
    let claim_id = envelope.claim_id;
    let result = match decision {
        Decision::Approve { split_remittance } => {
            approve_and_pay(&ledger, claim_id, split_remittance, verbose).await
        }
        Decision::Deny { code, reason } => {
            if verbose {
                log_claim_event(
                    "adjudicator",
                    &claim_id.to_string(),
                    "deny",
                    &format!("{code}: {reason}"),
                );
            }
            ledger
                .transition(claim_id, ClaimEvent::Deny { code, reason }, "adjudicator")
                .await
                .map(|claim| claim.status)
        }
    };

    match result {
        Ok(status) => {
            let _ = envelope
                .response_tx
                .send(DispositionMessage::Settled { claim_id, status })
                .await;
        }
        Err(err) => eprintln!("Adjudication failed for claim {claim_id}: {err}"),
    }
}

/// Accept the claim, post the insurer remittance (sometimes split into two
/// installments), then collect the patient share.
async fn approve_and_pay(
    ledger: &ClaimLedger,
    claim_id: uuid::Uuid,
    split_remittance: bool,
    verbose: bool,
) -> ClaimResult<ClaimStatus> {
    let claim = ledger
        .transition(claim_id, ClaimEvent::Accept, "adjudicator")
        .await?;
    if verbose {
        log_claim_event(
            "adjudicator",
            &claim_id.to_string(),
            "accept",
            &format!("Insurer owes {}", claim.insurance_payment),
        );
    }

    let insurer_share = claim.insurance_payment;
    if insurer_share.is_positive() {
        if split_remittance && insurer_share.cents() >= 2 {
            let first = Money::from_cents(insurer_share.cents() / 2);
            post(ledger, claim_id, first, PaymentMethod::InsurerRemittance).await?;
            post(
                ledger,
                claim_id,
                insurer_share - first,
                PaymentMethod::InsurerRemittance,
            )
            .await?;
        } else {
            post(ledger, claim_id, insurer_share, PaymentMethod::InsurerRemittance).await?;
        }
    }

    let patient_share = claim.patient_responsibility;
    if patient_share.is_positive() {
        post(ledger, claim_id, patient_share, PaymentMethod::PatientCard).await?;
    }

    Ok(ledger.get(claim_id).await?.status)
}

async fn post(
    ledger: &ClaimLedger,
    claim_id: uuid::Uuid,
    amount: Money,
    method: PaymentMethod,
) -> ClaimResult<()> {
    ledger
        .transition(claim_id, ClaimEvent::PostPayment { amount, method }, "adjudicator")
        .await?;
    Ok(())
}
