//! # Progress Tracking Module
//!
//! Consumer unico degli esiti dei task: trasforma ogni esito, in ordine di
//! completamento, in un `ProgressSnapshot` inviato al sink esterno tramite un
//! canale limitato. Alla fine invia uno snapshot terminale `done` al 100%.
//!
//! Il sink è un parametro esplicito: se viene chiuso, il tracker continua a
//! consumare gli esiti così i worker non restano mai bloccati.

use crate::{
    copier::task_copier::TaskOutcome,
    progress::{CopyResult, ResultAggregator},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Status label carried by a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressStatus {
    Copied,
    Simulated,
    Failed { reason: String },
    Done,
}

/// Progress after one completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_file: String,
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
    pub status: ProgressStatus,
}

impl ProgressSnapshot {
    pub fn new(current_file: String, processed: usize, total: usize, status: ProgressStatus) -> Self {
        let percentage = if total > 0 {
            (processed as f64 / total as f64) * 100.0
        } else {
            100.0
        };

        Self {
            current_file,
            processed,
            total,
            percentage,
            status,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ProgressStatus::Done
    }

    /// One-line description for logs and the progress bar
    pub fn message(&self) -> String {
        match &self.status {
            ProgressStatus::Copied => format!("[OK] {}", self.current_file),
            ProgressStatus::Simulated => format!("[DRY RUN] {}", self.current_file),
            ProgressStatus::Failed { reason } => format!("[ERROR] {}: {}", self.current_file, reason),
            ProgressStatus::Done => "Done".to_string(),
        }
    }
}

/// Turns task outcomes into progress snapshots
pub struct ProgressTracker {
    total: usize,
    processed: usize,
    aggregator: ResultAggregator,
    sink: Option<mpsc::Sender<ProgressSnapshot>>,
}

impl ProgressTracker {
    /// Crea un nuovo tracker con totale fissato prima dell'avvio
    pub fn new(total: usize, sink: mpsc::Sender<ProgressSnapshot>) -> Self {
        Self {
            total,
            processed: 0,
            aggregator: ResultAggregator::new(),
            sink: Some(sink),
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Registra un esito ed emette lo snapshot corrispondente
    pub async fn observe(&mut self, outcome: &TaskOutcome) {
        if self.processed >= self.total {
            warn!("Outcome for {} arrived after all {} tasks completed", outcome.task.source.display(), self.total);
        } else {
            self.processed += 1;
        }

        self.aggregator.record(outcome);

        let status = match &outcome.result {
            Ok(success) if success.simulated => ProgressStatus::Simulated,
            Ok(_) => ProgressStatus::Copied,
            Err(e) => ProgressStatus::Failed { reason: e.to_string() },
        };
        let snapshot = ProgressSnapshot::new(outcome.task.file_name(), self.processed, self.total, status);
        self.emit(snapshot).await;
    }

    /// Emette lo snapshot terminale e restituisce il riepilogo
    pub async fn finish(mut self) -> CopyResult {
        let done = ProgressSnapshot::new(String::new(), self.total, self.total, ProgressStatus::Done);
        self.emit(done).await;
        self.aggregator.finish()
    }

    /// Consuma tutti gli esiti fino alla chiusura del canale
    pub async fn report(mut self, mut outcomes: mpsc::Receiver<TaskOutcome>) -> CopyResult {
        while let Some(outcome) = outcomes.recv().await {
            self.observe(&outcome).await;
        }
        self.finish().await
    }

    async fn emit(&mut self, snapshot: ProgressSnapshot) {
        if let Some(sink) = &self.sink {
            if sink.send(snapshot).await.is_err() {
                debug!("Progress sink closed, continuing without progress events");
                self.sink = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copier::task_copier::{CopySuccess, CopyTask};
    use crate::error::TaskError;
    use std::path::PathBuf;

    fn outcome(name: &str, ok: bool) -> TaskOutcome {
        let task = CopyTask::new(PathBuf::from("/in").join(name), PathBuf::from("/out").join(name));
        if ok {
            TaskOutcome {
                task,
                result: Ok(CopySuccess { bytes: 10, simulated: false, hash: None }),
            }
        } else {
            TaskOutcome::failed(task, TaskError::TargetExists(PathBuf::from("/out").join(name)))
        }
    }

    #[tokio::test]
    async fn test_n_snapshots_then_done() {
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        let (progress_tx, mut progress_rx) = mpsc::channel(8);

        for (name, ok) in [("a.jpg", true), ("b.jpg", false), ("c.jpg", true)] {
            outcome_tx.send(outcome(name, ok)).await.unwrap();
        }
        drop(outcome_tx);

        let tracker = ProgressTracker::new(3, progress_tx);
        let collector = tokio::spawn(async move {
            let mut snapshots = Vec::new();
            while let Some(snapshot) = progress_rx.recv().await {
                snapshots.push(snapshot);
            }
            snapshots
        });

        let result = tracker.report(outcome_rx).await;
        let snapshots = collector.await.unwrap();

        assert_eq!(snapshots.len(), 4);
        let processed: Vec<usize> = snapshots.iter().map(|s| s.processed).collect();
        assert_eq!(processed, vec![1, 2, 3, 3]);
        assert!(snapshots[..3].iter().all(|s| !s.is_done() && s.total == 3));
        assert!(matches!(snapshots[1].status, ProgressStatus::Failed { .. }));
        assert_eq!(snapshots[1].current_file, "b.jpg");

        let last = snapshots.last().unwrap();
        assert!(last.is_done());
        assert_eq!(last.processed, last.total);
        assert_eq!(last.percentage, 100.0);

        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.total_size, 20);
    }

    #[tokio::test]
    async fn test_closed_sink_keeps_draining() {
        let (outcome_tx, outcome_rx) = mpsc::channel(4);
        let (progress_tx, progress_rx) = mpsc::channel(1);
        drop(progress_rx);

        outcome_tx.send(outcome("a.jpg", true)).await.unwrap();
        outcome_tx.send(outcome("b.jpg", true)).await.unwrap();
        drop(outcome_tx);

        let result = ProgressTracker::new(2, progress_tx).report(outcome_rx).await;
        assert_eq!(result.success_count, 2);
    }

    #[test]
    fn test_snapshot_percentage_and_message() {
        let snapshot = ProgressSnapshot::new("a.jpg".to_string(), 1, 4, ProgressStatus::Copied);
        assert_eq!(snapshot.percentage, 25.0);
        assert_eq!(snapshot.message(), "[OK] a.jpg");

        let json = serde_json::to_value(&ProgressStatus::Failed { reason: "boom".to_string() }).unwrap();
        assert_eq!(json["kind"], "failed");
        assert_eq!(json["reason"], "boom");
    }
}
