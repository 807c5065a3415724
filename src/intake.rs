use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::Duration;
use uuid::Uuid;

use crate::builder::{BuildOptions, build_claim};
use crate::catalog::ProcedureCatalog;
use crate::config::Config;
use crate::ledger::{ClaimEvent, ClaimLedger};
use crate::logging::log_claim_event;
use crate::message::{AdjudicationEnvelope, AdjudicatorMessage, DispositionMessage};
use crate::policy::PayerPolicyTable;
use crate::schema::ClaimRequest;

/// Intake task that turns claim requests into ledger claims.
///
/// For each incoming request:
/// - Builds and prices the claim against the catalog and payer policies.
/// - Inserts it into the ledger and submits it.
/// - Creates a one-time channel for the adjudication disposition and
///   spawns a listener task to handle it asynchronously.
/// - Sends the claim to the adjudicator via the `AdjudicatorMessage`
///   channel.
///
/// Requests that fail to build or submit stay behind as rejected input or
/// Draft claims; they still count toward shutdown so the run always
/// completes. The ingest rate is controlled by the configured interval.
#[allow(clippy::too_many_arguments)]
pub async fn run_intake(
    config: Config,
    catalog: Arc<ProcedureCatalog>,
    policies: Arc<PayerPolicyTable>,
    ledger: Arc<ClaimLedger>,
    mut rx: Receiver<ClaimRequest>,
    tx: Sender<AdjudicatorMessage>,
    test_notify: Option<Sender<Uuid>>, //optional notification for dispositions
    total_requests: usize,
    shutdown_tx: Sender<()>,
) -> anyhow::Result<()> {
    if config.ingest_rate == 0 {
        return Err(anyhow::anyhow!("Config ingest_rate must be non-zero"));
    }
    let interval = Duration::from_secs(config.ingest_rate);
    let mut ticker = tokio::time::interval(interval);
    let verbose = config.verbose;
    if verbose {
        log_claim_event("intake", "-", "start", "Starting intake task");
    }
    let settled = Arc::new(AtomicUsize::new(0));
    let mut requests_seen = 0;

    while let Some(request) = rx.recv().await {
        ticker.tick().await;
        requests_seen += 1;
        process_request(
            request,
            &catalog,
            &policies,
            &ledger,
            &tx,
            &test_notify,
            verbose,
            settled.clone(),
            total_requests,
            shutdown_tx.clone(),
        )
        .await?;
        if requests_seen == total_requests {
            break;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn process_request(
    request: ClaimRequest,
    catalog: &ProcedureCatalog,
    policies: &PayerPolicyTable,
    ledger: &Arc<ClaimLedger>,
    tx: &Sender<AdjudicatorMessage>,
    test_notify: &Option<Sender<Uuid>>,
    verbose: bool,
    settled: Arc<AtomicUsize>,
    total_requests: usize,
    shutdown_tx: Sender<()>,
) -> anyhow::Result<()> {
    let claim = match build_claim(catalog, policies, &request, &BuildOptions::default()) {
        Ok(claim) => claim,
        Err(err) => {
            log_claim_event("intake", "-", "build_rejected", &err.to_string());
            settle_one(&settled, total_requests, &shutdown_tx).await;
            return Ok(());
        }
    };
    let claim = match ledger.insert(claim).await {
        Ok(claim) => claim,
        Err(err) => {
            log_claim_event("intake", "-", "insert_rejected", &err.to_string());
            settle_one(&settled, total_requests, &shutdown_tx).await;
            return Ok(());
        }
    };
    let claim_id = claim.claim_id;
    if verbose {
        log_claim_event(
            "intake",
            &claim_id.to_string(),
            "claim_built",
            &format!(
                "{} for {}: gross {}, net {}",
                claim.claim_number.as_deref().unwrap_or("-"),
                claim.payer,
                claim.gross_charges,
                claim.net_charges
            ),
        );
    }

    if let Err(err) = ledger.transition(claim_id, ClaimEvent::Submit, "intake").await {
        // Unverified eligibility: leave the claim parked in Draft
        log_claim_event(
            "intake",
            &claim_id.to_string(),
            "submit_rejected",
            &err.to_string(),
        );
        settle_one(&settled, total_requests, &shutdown_tx).await;
        return Ok(());
    }

    let (disposition_tx, disposition_rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(listen_for_disposition(
        disposition_rx,
        claim_id,
        test_notify.clone(),
        verbose,
        settled,
        total_requests,
        shutdown_tx,
    ));
    let envelope = AdjudicationEnvelope {
        claim_id,
        response_tx: disposition_tx,
    };
    if verbose {
        log_claim_event(
            "intake",
            &claim_id.to_string(),
            "sending_to_adjudicator",
            "Submitted claim forwarded for adjudication",
        );
    }
    if tx
        .send(AdjudicatorMessage::Adjudicate(envelope))
        .await
        .is_err()
    {
        eprintln!("Adjudicator dropped");
        return Err(anyhow::anyhow!("Adjudicator channel dropped"));
    }
    Ok(())
}

async fn listen_for_disposition(
    mut rx: Receiver<DispositionMessage>,
    claim_id: Uuid,
    test_notify: Option<Sender<Uuid>>,
    verbose: bool,
    settled: Arc<AtomicUsize>,
    total_requests: usize,
    shutdown_tx: Sender<()>,
) {
    if let Some(DispositionMessage::Settled { status, .. }) = rx.recv().await {
        if verbose {
            log_claim_event(
                "intake",
                &claim_id.to_string(),
                "disposition",
                &format!("Claim settled as {status}"),
            );
        }
        if let Some(tx) = test_notify {
            let _ = tx.send(claim_id).await;
        }
        settle_one(&settled, total_requests, &shutdown_tx).await;
    }
}

async fn settle_one(settled: &AtomicUsize, total_requests: usize, shutdown_tx: &Sender<()>) {
    let count = settled.fetch_add(1, Ordering::SeqCst) + 1;
    if count == total_requests {
        let _ = shutdown_tx.send(()).await;
    }
}
