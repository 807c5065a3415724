use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;

use claimcore::adjudicator::Adjudicator;
use claimcore::catalog::ProcedureCatalog;
use claimcore::config::Config;
use claimcore::intake::run_intake;
use claimcore::json_faker::write_fake_requests_jsonl;
use claimcore::ledger::ClaimLedger;
use claimcore::policy::PayerPolicyTable;
use claimcore::reader::stream_requests;
use claimcore::reporter::{print_report, run_reporter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let catalog = Arc::new(ProcedureCatalog::standard());
    let policies = Arc::new(PayerPolicyTable::standard());
    let ledger = Arc::new(ClaimLedger::new());

    if !Path::new(&config.file_path).exists() {
        write_fake_requests_jsonl(&config.file_path, &catalog, config.generate)?;
        println!(
            "Generated {} claim requests at {}",
            config.generate, config.file_path
        );
    }
    let total_requests = std::fs::read_to_string(&config.file_path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count();
    if total_requests == 0 {
        println!("No claim requests in {}", config.file_path);
        return Ok(());
    }
    println!(
        "Processing {} claim requests from {}",
        total_requests, config.file_path
    );

    let (request_tx, request_rx) = tokio::sync::mpsc::channel(32);
    let (adj_tx, adj_rx) = tokio::sync::mpsc::channel(32);
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel(1);

    let reader_path = config.file_path.clone();
    let mut handles = vec![
        tokio::spawn(async move {
            if let Err(err) = stream_requests(&reader_path, request_tx).await {
                eprintln!("Reader failed: {err}");
            }
        }),
        tokio::spawn({
            let config = config.clone();
            let catalog = catalog.clone();
            let policies = policies.clone();
            let ledger = ledger.clone();
            async move {
                if let Err(err) = run_intake(
                    config,
                    catalog,
                    policies,
                    ledger,
                    request_rx,
                    adj_tx,
                    None,
                    total_requests,
                    shutdown_tx,
                )
                .await
                {
                    eprintln!("Intake failed: {err}");
                }
            }
        }),
    ];

    let adjudicator = Adjudicator::new(ledger.clone(), 1, 3, 0.8, adj_rx, config.verbose);
    handles.push(tokio::spawn(async move {
        adjudicator.run().await;
    }));
    handles.push(tokio::spawn(run_reporter(
        ledger.clone(),
        config.report_interval,
        config.verbose,
    )));

    tokio::select! {
        _ = shutdown_rx.recv() => {
            println!("All claim requests settled");
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
        }
    }

    // Final report from whatever state the ledger reached
    print_report(&ledger.snapshot().await);

    for handle in &handles {
        handle.abort();
    }
    join_all(handles).await;
    Ok(())
}
