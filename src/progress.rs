//! # Progress Display and Result Aggregation Module
//!
//! Questo modulo gestisce il riepilogo finale della copia e la progress bar.
//!
//! ## Responsabilità:
//! - `CopyResult`: riepilogo finale (successi, errori, messaggi, byte copiati)
//! - `ResultAggregator`: consumer sincrono degli esiti dei task
//! - `ProgressManager`: progress bar visual con `indicatif` per la CLI
//!
//! ## Statistiche tracciate:
//! - **success_count**: File copiati (o simulati in dry run)
//! - **error_count**: File non copiati, annullati inclusi
//! - **cancelled_count**: File saltati per annullamento del run
//! - **errors**: Messaggi di errore `"<nome file>: <dettaglio>"` in ordine di completamento
//! - **total_size**: Byte copiati dai soli task riusciti
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 90/150 (60%) photo.jpg
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut aggregator = ResultAggregator::new();
//! while let Some(outcome) = outcomes.recv().await {
//!     aggregator.record(&outcome);
//! }
//! let result = aggregator.finish();
//! println!("{}", result.format_summary());
//! ```

use crate::{copier::task_copier::TaskOutcome, error::TaskError, file_manager::FileManager};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Final summary of a copy run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyResult {
    pub success_count: usize,
    pub error_count: usize,
    pub cancelled_count: usize,
    pub errors: Vec<String>,
    pub total_size: u64,
}

impl CopyResult {
    /// Tasks accounted for so far
    pub fn processed(&self) -> usize {
        self.success_count + self.error_count
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Copied: {} files | Errors: {} | Total size: {}",
            self.success_count,
            self.error_count,
            FileManager::format_size(self.total_size)
        );
        if self.cancelled_count > 0 {
            summary.push_str(&format!(" | Cancelled: {}", self.cancelled_count));
        }
        summary
    }
}

/// Folds task outcomes into a `CopyResult`
#[derive(Debug, Default)]
pub struct ResultAggregator {
    result: CopyResult,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &TaskOutcome) {
        match &outcome.result {
            Ok(success) => {
                self.result.success_count += 1;
                self.result.total_size += success.bytes;
            }
            Err(e) => {
                self.result.error_count += 1;
                if matches!(e, TaskError::Cancelled) {
                    self.result.cancelled_count += 1;
                }
                if let Some(message) = outcome.error_message() {
                    self.result.errors.push(message);
                }
            }
        }
    }

    pub fn finish(self) -> CopyResult {
        self.result
    }

    /// Consuma tutti gli esiti fino alla chiusura del canale
    pub async fn drain(mut outcomes: mpsc::Receiver<TaskOutcome>) -> CopyResult {
        let mut aggregator = Self::new();
        while let Some(outcome) = outcomes.recv().await {
            aggregator.record(&outcome);
        }
        aggregator.finish()
    }
}

/// Manages the terminal progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Move the bar to `processed` with a message
    pub fn update(&self, processed: u64, message: &str) {
        self.bar.set_position(processed);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
