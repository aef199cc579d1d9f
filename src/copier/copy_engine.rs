//! # Copy Engine Module
//!
//! Pool di worker a dimensione fissa che consuma i task di copia.
//!
//! ## Funzionamento:
//! - I task sono pre-calcolati e inseriti in una coda MPMC (`async-channel`)
//!   con capacità pari al numero di task; la coda viene chiusa subito dopo
//! - Ogni worker preleva il prossimo task libero finché la coda non è vuota
//! - Ogni esito viene inviato su un unico canale `mpsc`; un errore su un file
//!   non interrompe gli altri worker
//! - Con 1 worker la semantica è sequenziale, con N worker concorrente
//!
//! ## Cancellazione:
//! - Il `CancellationToken` viene controllato prima di ogni task e durante
//!   l'attesa sulla coda
//! - Una copia già iniziata viene completata prima di osservare l'annullamento
//! - Dopo l'annullamento i task rimasti in coda ricevono un esito `Cancelled`

use crate::{
    config::CopyOptions,
    copier::task_copier::{CopyTask, TaskCopier, TaskOutcome},
    error::{CopyError, TaskError},
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Bounded worker pool executing copy tasks
#[derive(Debug, Clone)]
pub struct CopyEngine {
    copier: TaskCopier,
    workers: usize,
}

impl CopyEngine {
    pub fn new(options: &CopyOptions) -> Self {
        Self {
            copier: TaskCopier::new(options),
            workers: options.workers.unwrap_or_else(default_workers),
        }
    }

    /// Override the pool size
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Esegue tutti i task; ritorna quando ogni task ha prodotto un esito
    pub async fn run(
        &self,
        tasks: Vec<CopyTask>,
        outcomes: mpsc::Sender<TaskOutcome>,
        cancel: CancellationToken,
    ) -> Result<(), CopyError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let worker_count = self.workers.clamp(1, tasks.len());
        info!("Starting {} copy workers for {} files", worker_count, tasks.len());

        let (task_tx, task_rx) = async_channel::bounded(tasks.len());
        for task in tasks {
            if let Err(e) = task_tx.try_send(task) {
                debug!("Task queue rejected {}", e.into_inner().source.display());
            }
        }
        task_tx.close();

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(Self::worker(
                worker_id,
                self.copier.clone(),
                task_rx.clone(),
                outcomes.clone(),
                cancel.clone(),
            ));
        }
        drop(task_rx);
        drop(outcomes);

        while let Some(joined) = workers.join_next().await {
            joined?;
        }

        debug!("All copy workers finished");
        Ok(())
    }

    async fn worker(
        worker_id: usize,
        copier: TaskCopier,
        tasks: async_channel::Receiver<CopyTask>,
        outcomes: mpsc::Sender<TaskOutcome>,
        cancel: CancellationToken,
    ) {
        loop {
            let task = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                task = tasks.recv() => match task {
                    Ok(task) => task,
                    Err(_) => return,
                },
            };

            let outcome = copier.process(task, &cancel).await;
            if outcomes.send(outcome).await.is_err() {
                debug!("Worker {}: outcome receiver dropped", worker_id);
            }
        }

        let mut drained = 0usize;
        while let Ok(task) = tasks.try_recv() {
            drained += 1;
            let _ = outcomes.send(TaskOutcome::failed(task, TaskError::Cancelled)).await;
        }
        debug!("Worker {} cancelled, {} queued tasks marked as cancelled", worker_id, drained);
    }
}

/// Number of available execution units
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4)
}
