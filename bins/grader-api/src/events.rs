// Verdict notifications published after each grading

use chrono::{DateTime, Utc};
use grader_common::types::{Verdict, VerdictStatus};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct VerdictEvent {
    pub id: Uuid,
    pub status: VerdictStatus,
    pub execution_time_ms: u64,
    pub graded_at: DateTime<Utc>,
}

impl VerdictEvent {
    pub fn from_verdict(id: Uuid, verdict: &Verdict) -> Self {
        Self {
            id,
            status: verdict.status(),
            execution_time_ms: verdict.execution_time_ms(),
            graded_at: Utc::now(),
        }
    }
}

/// Publish to whoever is listening; having no subscribers is not an error.
pub fn publish(sender: &broadcast::Sender<VerdictEvent>, event: VerdictEvent) {
    let id = event.id;
    match sender.send(event) {
        Ok(receivers) => debug!(id = %id, receivers, "Verdict event published"),
        Err(_) => debug!(id = %id, "No verdict event subscribers"),
    }
}

/// Background consumer that mirrors every verdict into the log
pub async fn log_events(mut rx: broadcast::Receiver<VerdictEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => info!(
                id = %event.id,
                status = %event.status,
                execution_time_ms = event.execution_time_ms,
                "Verdict recorded"
            ),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_verdict() {
        let verdict = Verdict::failed("Test Case 1: Passed", "Test Case 2 Failed: x", 42, vec![]);
        let id = Uuid::new_v4();
        let event = VerdictEvent::from_verdict(id, &verdict);

        assert_eq!(event.id, id);
        assert_eq!(event.status, VerdictStatus::Failed);
        assert_eq!(event.execution_time_ms, 42);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["graded_at"].is_string());
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let (tx, mut rx) = broadcast::channel(4);
        let verdict = Verdict::passed("All 1 test cases passed!", 3, vec![]);

        publish(&tx, VerdictEvent::from_verdict(Uuid::new_v4(), &verdict));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.status, VerdictStatus::Passed);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let (tx, rx) = broadcast::channel::<VerdictEvent>(4);
        drop(rx);
        let verdict = Verdict::passed("All 1 test cases passed!", 3, vec![]);
        publish(&tx, VerdictEvent::from_verdict(Uuid::new_v4(), &verdict));
    }
}
