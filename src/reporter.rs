use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use colored::Colorize;
use prettytable::{Table, row};
use tokio::time;

use crate::aging::{Kpis, kpis};
use crate::ledger::{ClaimLedger, LedgerSnapshot};

/// Reporter task that periodically prints the A/R aging table and the
/// portfolio KPI block from a ledger snapshot.
pub async fn run_reporter(ledger: Arc<ClaimLedger>, interval_secs: u64, verbose: bool) {
    if verbose {
        println!("[reporter] Starting reporter task");
    }
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;
        let snapshot = ledger.snapshot().await;
        print_report(&snapshot);
    }
}

/// Render one report to stdout.
pub fn print_report(snapshot: &LedgerSnapshot) {
    let as_of = Utc::now().date_naive();
    let k = kpis(snapshot, as_of);

    println!("\n{}", "--- A/R Aging ---".bold());
    let mut table = Table::new();
    table.add_row(row!["Bucket", "Claims", "Outstanding"]);
    for bucket in &k.aging {
        table.add_row(row![
            bucket.range.label(),
            bucket.claim_count,
            bucket.total_balance.to_string()
        ]);
    }
    table.printstd();

    println!("{}", "--- Portfolio KPIs ---".bold());
    println!("claims: {}", k.total_claims);
    println!("gross charges: {}", k.gross_charges);
    println!("net charges: {}", k.net_charges);
    println!("collected: {}", k.collected);
    println!("total A/R: {}", k.total_ar);
    println!("days in A/R: {:.1}", k.days_in_ar);
    println!(
        "net collection rate: {}",
        rate_colored(k.net_collection_rate, 85.0)
    );
    println!("denial rate: {}", denial_colored(&k));
    println!();
}

fn rate_colored(rate: f64, target: f64) -> String {
    let text = format!("{rate:.1}%");
    if rate >= target {
        text.green().to_string()
    } else {
        text.yellow().to_string()
    }
}

fn denial_colored(k: &Kpis) -> String {
    let text = format!("{:.1}%", k.denial_rate);
    if k.denial_rate > 15.0 {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}
