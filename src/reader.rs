use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;

use crate::schema::ClaimRequest;

/// Stream claim requests from a JSONL file into the intake channel.
///
/// Malformed lines are logged and skipped rather than aborting the stream.
pub async fn stream_requests(path: &str, sender: Sender<ClaimRequest>) -> anyhow::Result<()> {
    let file = File::open(path).await?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<ClaimRequest>(&line) {
            Ok(request) => {
                if sender.send(request).await.is_err() {
                    eprintln!("Intake receiver dropped");
                    break;
                }
            }
            Err(err) => eprintln!("Invalid claim request skipped: {}", err),
        }
    }

    Ok(())
}
