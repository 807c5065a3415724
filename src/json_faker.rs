use std::fs::File;
use std::io::{BufWriter, Write};

use chrono::{Duration, Utc};
use fake::Fake;
use fake::faker::boolean::en::Boolean;
use fake::faker::number::en::NumberWithFormat;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::catalog::ProcedureCatalog;
use crate::policy::PayerCategory;
use crate::schema::{ClaimRequest, RequestLine};

/// Generate a realistic claim request against the given catalog.
///
/// Dates of service are spread over the last 120 days so the aging report
/// fills all four buckets; a small share of requests arrive without a
/// verified benefit check.
pub fn fake_claim_request(catalog: &ProcedureCatalog) -> ClaimRequest {
    let mut rng = rand::rng();
    let codes: Vec<&str> = catalog.codes().map(|c| c.code.as_str()).collect();

    let line_count = rng.random_range(1..=3);
    let lines = (0..line_count)
        .map(|_| RequestLine {
            procedure_code: codes
                .choose(&mut rng)
                .expect("catalog is not empty")
                .to_string(),
            quantity: rng.random_range(1..=3),
        })
        .collect();

    let days_back = rng.random_range(0..=120);
    ClaimRequest {
        patient_id: format!("PT-{}", NumberWithFormat("#####").fake::<String>()),
        date_of_service: Utc::now().date_naive() - Duration::days(days_back),
        payer: *PayerCategory::ALL.choose(&mut rng).expect("payer list is not empty"),
        lines,
        eligibility_verified: Boolean(95).fake(),
        prior_authorization: if Boolean(20).fake() {
            Some(format!("PA-{}", NumberWithFormat("######").fake::<String>()))
        } else {
            None
        },
    }
}

/// Write n fake claim requests to a JSONL file for simulation
pub fn write_fake_requests_jsonl(
    path: &str,
    catalog: &ProcedureCatalog,
    n: usize,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for _ in 0..n {
        let request = fake_claim_request(catalog);
        let json = serde_json::to_string(&request)?;
        writeln!(writer, "{}", json)?;
    }
    Ok(())
}
