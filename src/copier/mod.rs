//! # Copier Module
//!
//! Pipeline di copia separata in sottomoduli:
//! - `media_copier`: Orchestratore principale
//! - `copy_engine`: Pool di worker con coda limitata e cancellazione
//! - `task_copier`: Copia di un singolo file
//! - `progress_tracker`: Snapshot di progresso per il sink esterno
//! - `path_resolver`: Logica di calcolo path centralizzata
//! - `clock`: Orologio iniettabile per le directory per data

pub mod clock;
pub mod copy_engine;
pub mod media_copier;
pub mod path_resolver;
pub mod progress_tracker;
pub mod task_copier;

pub use clock::{Clock, FixedClock, SystemClock};
pub use copy_engine::CopyEngine;
pub use media_copier::MediaCopier;
pub use path_resolver::{PathResolver, PlannedCopies};
pub use progress_tracker::{ProgressSnapshot, ProgressStatus, ProgressTracker};
pub use task_copier::{CopySuccess, CopyTask, TaskCopier, TaskOutcome};
