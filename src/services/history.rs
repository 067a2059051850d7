// src/services/history.rs

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::EXAM_HISTORY_KEY,
    models::exam_record::{ExamResult, HistorySummary},
    storage::{KeyValueStore, read_json, write_json},
};

/// Append-only list of completed exam results.
///
/// Recording never fails: if the store rejects the write, the result stays
/// in memory and the whole list is written again on the next success.
pub struct ExamHistory {
    store: Arc<dyn KeyValueStore>,
    results: Mutex<Vec<ExamResult>>,
}

impl ExamHistory {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let results: Vec<ExamResult> = read_json(store.as_ref(), EXAM_HISTORY_KEY)
            .await
            .unwrap_or_default();

        Self {
            store,
            results: Mutex::new(results),
        }
    }

    pub async fn record(&self, result: ExamResult) {
        let mut results = self.results.lock().await;
        if results.iter().any(|r| r.session_id == result.session_id) {
            tracing::warn!("Session {} already has a result, ignoring", result.session_id);
            return;
        }

        tracing::info!(
            "Recorded exam {}: {}% ({}/{}), passed={}",
            result.session_id,
            result.percentage,
            result.correct_count,
            result.total_count,
            result.passed
        );
        results.push(result);

        if let Err(e) = write_json(self.store.as_ref(), EXAM_HISTORY_KEY, &*results).await {
            tracing::warn!("Failed to persist exam history, keeping it in memory: {}", e);
        }
    }

    /// All results, oldest first.
    pub async fn list(&self) -> Vec<ExamResult> {
        self.results.lock().await.clone()
    }

    pub async fn summary(&self) -> HistorySummary {
        summarize(&self.results.lock().await)
    }
}

fn summarize(results: &[ExamResult]) -> HistorySummary {
    if results.is_empty() {
        return HistorySummary::default();
    }

    let attempts = results.len() as u64;
    let percentage_sum: u64 = results.iter().map(|r| u64::from(r.percentage)).sum();
    let seconds: u64 = results.iter().map(|r| u64::from(r.time_spent_seconds)).sum();
    let questions: u64 = results.iter().map(|r| u64::from(r.total_count)).sum();

    HistorySummary {
        total_attempts: attempts as u32,
        passed_attempts: results.iter().filter(|r| r.passed).count() as u32,
        average_percentage: round_div(percentage_sum, attempts) as u8,
        best_percentage: results.iter().map(|r| r.percentage).max().unwrap_or(0),
        average_seconds_per_question: if questions == 0 {
            0
        } else {
            round_div(seconds, questions) as u32
        },
    }
}

fn round_div(n: u64, d: u64) -> u64 {
    (2 * n + d) / (2 * d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn result(percentage: u8, passed: bool, time_spent_seconds: u32) -> ExamResult {
        ExamResult {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            exam_type: "general".to_string(),
            correct_count: u32::from(percentage) / 10,
            total_count: 10,
            percentage,
            time_spent_seconds,
            passed,
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_persists_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let history = ExamHistory::load(store.clone()).await;

        history.record(result(80, true, 300)).await;
        history.record(result(50, false, 600)).await;

        let reloaded = ExamHistory::load(store).await;
        assert_eq!(reloaded.list().await, history.list().await);
        assert_eq!(reloaded.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_same_session_is_recorded_once() {
        let history = ExamHistory::load(Arc::new(MemoryStore::new())).await;
        let r = result(90, true, 100);

        history.record(r.clone()).await;
        history.record(r).await;

        assert_eq!(history.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_history_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.seed(EXAM_HISTORY_KEY, "{not json");

        let history = ExamHistory::load(store).await;
        assert!(history.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_result_in_memory() {
        let store = Arc::new(MemoryStore::new());
        let history = ExamHistory::load(store.clone()).await;
        store.set_reject_writes(true);

        history.record(result(70, true, 200)).await;
        assert_eq!(history.list().await.len(), 1);
        assert!(!store.contains(EXAM_HISTORY_KEY));

        // The next successful write carries the earlier result too.
        store.set_reject_writes(false);
        history.record(result(40, false, 200)).await;
        let reloaded = ExamHistory::load(store).await;
        assert_eq!(reloaded.list().await.len(), 2);
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&[
            result(80, true, 300),
            result(55, false, 600),
            result(100, true, 150),
        ]);

        assert_eq!(summary.total_attempts, 3);
        assert_eq!(summary.passed_attempts, 2);
        assert_eq!(summary.average_percentage, 78); // 235 / 3 = 78.3
        assert_eq!(summary.best_percentage, 100);
        assert_eq!(summary.average_seconds_per_question, 35); // 1050 / 30
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(summarize(&[]), HistorySummary::default());
    }
}
