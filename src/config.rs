use clap::Parser;

/// Settings for the claim adjudication simulation.
#[derive(Debug, Clone, Parser)]
#[command(name = "claimcore", about = "Claim adjudication and A/R simulation")]
pub struct Config {
    /// JSONL file with intake claim requests
    #[arg(default_value = "claim_requests.jsonl")]
    pub file_path: String,

    /// Seconds between claim intakes
    #[arg(long, default_value_t = 1)]
    pub ingest_rate: u64,

    /// Number of requests to generate when the input file is missing
    #[arg(long, default_value_t = 25)]
    pub generate: usize,

    /// Seconds between A/R reports
    #[arg(long, default_value_t = 5)]
    pub report_interval: u64,

    /// Enable detailed per-claim event logging
    #[arg(long, short)]
    pub verbose: bool,
}

#[cfg(test)]
pub fn mock_config() -> Config {
    Config {
        file_path: "mock_path.jsonl".to_string(),
        ingest_rate: 1,
        generate: 5,
        report_interval: 5,
        verbose: false,
    }
}
