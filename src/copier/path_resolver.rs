//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di destinazione.
//!
//! Ordine delle sottodirectory: data (se abilitata), poi formato (se abilitato).
//! In modalità `preserve_structure` data e formato sono ignorati e viene
//! replicato il path relativo alla directory sorgente.

use crate::{
    config::{CopyOptions, DateSource},
    copier::{
        clock::Clock,
        task_copier::{CopyTask, TaskOutcome},
    },
    error::TaskError,
    file_manager::FileManager,
};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tasks ready for the engine plus sources rejected at planning time
#[derive(Debug, Default)]
pub struct PlannedCopies {
    pub tasks: Vec<CopyTask>,
    pub conflicts: Vec<TaskOutcome>,
}

impl PlannedCopies {
    /// Number of matched files, conflicts included
    pub fn total(&self) -> usize {
        self.tasks.len() + self.conflicts.len()
    }
}

/// Computes destination paths for source files
pub struct PathResolver<'a> {
    options: &'a CopyOptions,
    clock: &'a dyn Clock,
}

impl<'a> PathResolver<'a> {
    pub fn new(options: &'a CopyOptions, clock: &'a dyn Clock) -> Self {
        Self { options, clock }
    }

    /// Calcola il path di destinazione per un file
    pub fn plan(&self, source: &Path) -> PathBuf {
        let file_name = source.file_name().unwrap_or_default();
        let mut destination = self.options.target_dir.clone();

        if self.options.preserve_structure {
            match source.strip_prefix(&self.options.source_dir) {
                Ok(rel) => {
                    if let Some(parent) = rel.parent() {
                        destination.push(parent);
                    }
                }
                Err(_) => {
                    debug!("{} is outside the source dir, flattening", source.display());
                }
            }
        } else {
            if self.options.date_grouping {
                destination.push(self.date_subdir(source));
            }
            if self.options.group_by_format {
                if let Some(format_dir) = Self::format_subdir(source) {
                    destination.push(format_dir);
                }
            }
        }

        destination.push(file_name);
        destination
    }

    /// Nome della directory per data, secondo la granularità configurata
    pub fn date_subdir(&self, source: &Path) -> String {
        self.timestamp_for(source)
            .format(self.options.date_granularity.format_str())
            .to_string()
    }

    /// Estensione in minuscolo senza il punto iniziale
    pub fn format_subdir(source: &Path) -> Option<String> {
        FileManager::extension_of(source)
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
    }

    fn timestamp_for(&self, source: &Path) -> DateTime<Local> {
        if self.options.date_source == DateSource::FileModified {
            match std::fs::metadata(source).and_then(|meta| meta.modified()) {
                Ok(modified) => return DateTime::<Local>::from(modified),
                Err(e) => {
                    debug!("Cannot read modification time of {}: {} - using current time", source.display(), e);
                }
            }
        }
        self.clock.now()
    }

    /// Pianifica tutti i file; a parità di destinazione vince il primo in ordine di scansione
    pub fn plan_all(&self, sources: Vec<PathBuf>) -> PlannedCopies {
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(sources.len());
        let mut planned = PlannedCopies::default();

        for source in sources {
            let destination = self.plan(&source);

            if let Some(first) = claimed.get(&destination) {
                warn!(
                    "Destination conflict: {} and {} both map to {}",
                    first.display(),
                    source.display(),
                    destination.display()
                );
                let error = TaskError::DestinationConflict {
                    destination: destination.clone(),
                    claimed_by: first.clone(),
                };
                planned.conflicts.push(TaskOutcome::failed(CopyTask::new(source, destination), error));
                continue;
            }

            claimed.insert(destination.clone(), source.clone());
            planned.tasks.push(CopyTask::new(source, destination));
        }

        planned
    }
}
