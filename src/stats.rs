//! Round Statistics Persistence
//!
//! Fire-and-forget recording of completed rounds. The round coordinator
//! hands a [`GameStatsRecord`] to a [`StatsSink`] and moves on: the round
//! transition never waits on the write, and a failing sink is logged and
//! otherwise invisible to players.
//!
//! The shipped sink appends one JSON object per line to a file. The game
//! originally wrote these rows to a `GameDetails` SQL table; an append-only
//! record file keeps the same write-only contract without a database.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Statistics for one completed round. Write-only: produced on round
/// completion, handed to the sink, never read back by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameStatsRecord {
    /// Wall-clock length of the round in seconds.
    pub duration_seconds: f64,
    /// Players connected when the goal was reached.
    pub player_count: usize,
}

/// A destination for round statistics.
///
/// `record` must not block and must not fail visibly: implementations
/// swallow and log their own errors.
pub trait StatsSink: Send + Sync {
    /// Enqueue one record, best-effort.
    fn record(&self, record: &GameStatsRecord);
}

/// Sink that discards everything. Used in tests and when no stats path is
/// configured.
#[derive(Debug, Default)]
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn record(&self, _record: &GameStatsRecord) {}
}

/// Stats sink errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// Could not open or create the stats file.
    #[error("failed to open stats file: {0}")]
    Open(#[from] std::io::Error),
}

/// One line in the stats file: the core record plus write-time context.
#[derive(Debug, Serialize, Deserialize)]
struct StatsLine {
    round: u64,
    duration_seconds: f64,
    player_count: usize,
    recorded_at: u64,
}

/// Append-only JSONL sink backed by a writer task.
///
/// `record` pushes onto a bounded channel and returns immediately; a
/// dedicated task drains the channel and appends to the file. A full
/// channel or a write error drops the record with a warning.
pub struct JsonlStatsSink {
    tx: mpsc::Sender<StatsLine>,
}

impl JsonlStatsSink {
    /// Open (creating if needed) the stats file and spawn the writer task.
    pub async fn open(path: PathBuf) -> Result<Self, StatsError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!("Recording round stats to {}", path.display());

        let (tx, mut rx) = mpsc::channel::<StatsLine>(64);
        tokio::spawn(async move {
            let mut round: u64 = 0;
            while let Some(mut line) = rx.recv().await {
                round += 1;
                line.round = round;

                let mut encoded = match serde_json::to_vec(&line) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Failed to encode stats record: {}", e);
                        continue;
                    }
                };
                encoded.push(b'\n');

                if let Err(e) = file.write_all(&encoded).await {
                    warn!("Failed to append stats record: {}", e);
                }
            }
        });

        Ok(Self { tx })
    }
}

impl StatsSink for JsonlStatsSink {
    fn record(&self, record: &GameStatsRecord) {
        let line = StatsLine {
            round: 0, // stamped by the writer task
            duration_seconds: record.duration_seconds,
            player_count: record.player_count,
            recorded_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };

        // Fire-and-forget: a full channel means the writer is wedged, and
        // losing a stats row must never stall the round transition.
        if self.tx.try_send(line).is_err() {
            warn!("Stats channel full, dropping round record");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("dungeon-stats-{}.jsonl", uuid::Uuid::new_v4()));

        let sink = JsonlStatsSink::open(path.clone()).await.unwrap();
        sink.record(&GameStatsRecord {
            duration_seconds: 12.5,
            player_count: 3,
        });
        sink.record(&GameStatsRecord {
            duration_seconds: 0.25,
            player_count: 1,
        });

        // Give the writer task a moment to drain.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["round"], 1);
        assert_eq!(first["duration_seconds"], 12.5);
        assert_eq!(first["player_count"], 3);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["round"], 2);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[test]
    fn test_null_sink_is_silent() {
        NullStatsSink.record(&GameStatsRecord {
            duration_seconds: 1.0,
            player_count: 0,
        });
    }
}
