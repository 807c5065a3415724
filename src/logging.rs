use colored::Colorize;

/// Structured per-claim event line used by the pipeline tasks.
pub fn log_claim_event(component: &str, claim_id: &str, event: &str, message: &str) {
    println!(
        "{} {}",
        format!("[{component}][claim:{claim_id}][{event}]").dimmed(),
        message
    );
}
