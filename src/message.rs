use tokio::sync::mpsc::Sender;
use uuid::Uuid;

use crate::claim::ClaimStatus;

/// Wraps a ledger claim id with a response channel for the final
/// disposition.
///
/// Used by intake to learn when the adjudicator has finished with a claim.
#[derive(Debug)]
pub struct AdjudicationEnvelope {
    pub claim_id: Uuid,
    pub response_tx: Sender<DispositionMessage>,
}

/// Message sent from intake to the adjudicator
#[derive(Debug)]
pub enum AdjudicatorMessage {
    Adjudicate(AdjudicationEnvelope),
}

/// Message sent from the adjudicator back to intake once a claim has
/// reached its post-adjudication resting state
#[derive(Debug)]
pub enum DispositionMessage {
    Settled {
        claim_id: Uuid,
        status: ClaimStatus,
    },
}
