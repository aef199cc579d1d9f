//! # Media Copier - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione da file JSON e override da CLI
//! - Avvio della copia con progress bar o output JSON
//! - Annullamento cooperativo con Ctrl-C
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` ha priorità)
//! 3. Carica la configurazione e applica gli argomenti
//! 4. Crea il `MediaCopier` e avvia la copia in modalità streaming
//! 5. Mostra il riepilogo finale
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-copier /media/card /photos --ext jpg,arw --date-dir --use-file-date --group-by-format
//! ```

use anyhow::Result;
use clap::Parser;
use media_copier::{
    file_manager::FileManager, json_output::JsonMessage, progress::ProgressManager, CopyOptions,
    DateGranularity, DateSource, MediaCopier, ProgressSnapshot,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "media-copier")]
#[command(about = "Copy media files into date and format organized folders")]
struct Args {
    /// Directory containing media files to copy
    source: Option<PathBuf>,

    /// Directory receiving the copies
    target: Option<PathBuf>,

    /// Accepted extensions (repeatable or comma separated, e.g. jpg,arw)
    #[arg(short, long, value_delimiter = ',')]
    ext: Vec<String>,

    /// Group copies into date directories
    #[arg(long)]
    date_dir: bool,

    /// Date directory granularity
    #[arg(long, value_enum)]
    granularity: Option<DateGranularity>,

    /// Use the file modification time instead of the current date
    #[arg(long)]
    use_file_date: bool,

    /// Group copies into per-format directories
    #[arg(long)]
    group_by_format: bool,

    /// Mirror the source directory structure
    #[arg(long)]
    preserve_structure: bool,

    /// Report existing target files as errors instead of replacing them
    #[arg(long)]
    no_overwrite: bool,

    /// Dry run - don't write any file
    #[arg(long)]
    dry_run: bool,

    /// Maximum scan depth (1 = only the source directory)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Don't copy modification times
    #[arg(long)]
    no_metadata: bool,

    /// Compute a SHA-256 digest of every copied file
    #[arg(long)]
    hash: bool,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Only scan the top level of the source directory
    #[arg(long)]
    no_recursive: bool,

    /// Skip files larger than this size in MB
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Copy at most this many files
    #[arg(long)]
    max_file_count: Option<usize>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save the effective configuration to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Only list the files that would be copied
    #[arg(long)]
    scan_only: bool,

    /// Output progress and result as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Applica gli argomenti CLI sopra la configurazione caricata
    fn apply(&self, options: &mut CopyOptions) {
        if let Some(ref source) = self.source {
            options.source_dir = source.clone();
        }
        if let Some(ref target) = self.target {
            options.target_dir = target.clone();
        }
        if !self.ext.is_empty() {
            options.extensions = self.ext.clone();
        }
        if self.date_dir {
            options.date_grouping = true;
        }
        if let Some(granularity) = self.granularity {
            options.date_granularity = granularity;
        }
        if self.use_file_date {
            options.date_source = DateSource::FileModified;
        }
        if self.group_by_format {
            options.group_by_format = true;
        }
        if self.preserve_structure {
            options.preserve_structure = true;
        }
        if self.no_overwrite {
            options.overwrite = false;
        }
        if self.dry_run {
            options.dry_run = true;
        }
        if self.max_depth.is_some() {
            options.max_depth = self.max_depth;
        }
        if self.no_metadata {
            options.copy_metadata = false;
        }
        if self.hash {
            options.generate_hash = true;
        }
        if self.include_hidden {
            options.ignore_hidden = false;
        }
        if self.no_recursive {
            options.recursive = false;
        }
        if let Some(mb) = self.max_file_size {
            options.max_file_size = Some(mb.saturating_mul(1024 * 1024));
        }
        if self.max_file_count.is_some() {
            options.max_file_count = self.max_file_count;
        }
        if self.workers.is_some() {
            options.workers = self.workers;
        }
        if self.json {
            options.json_output = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    // Solo warning in modalità JSON
    let default_level = match (args.verbose, args.json) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config_path = args.config.clone().or_else(CopyOptions::default_config_path);
    let mut options = match config_path {
        Some(ref path) => CopyOptions::from_file(path).await?,
        None => CopyOptions::default(),
    };
    args.apply(&mut options);

    if let Some(ref path) = args.save_config {
        options.save_to_file(path).await?;
        info!("Saved configuration to {}", path.display());
    }

    let copier = match MediaCopier::new(options) {
        Ok(copier) => copier,
        Err(e) => {
            if args.json {
                JsonMessage::error("Invalid options".to_string(), Some(e.to_string())).emit();
            }
            return Err(e.into());
        }
    };

    if args.scan_only {
        for file in copier.scan()? {
            println!("{}", file.display());
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted - finishing in-flight copies");
            ctrl_c_token.cancel();
        }
    });

    if args.json {
        JsonMessage::start(copier.options()).emit();
    }

    let start_time = Instant::now();
    let (progress_tx, progress_rx) = mpsc::channel(32);
    let renderer = tokio::spawn(render_progress(progress_rx, args.json));

    let outcome = copier.run_with_progress(progress_tx, cancel).await;
    renderer.await?;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if args.json {
                JsonMessage::error("Copy failed".to_string(), Some(e.to_string())).emit();
            }
            return Err(e.into());
        }
    };

    if args.json {
        JsonMessage::complete(result, start_time.elapsed().as_secs_f64()).emit();
    } else {
        for message in &result.errors {
            warn!("{}", message);
        }
        info!(
            "Copied {} in {:.1}s",
            FileManager::format_size(result.total_size),
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

/// Mostra gli snapshot come progress bar o righe JSON
async fn render_progress(mut progress_rx: mpsc::Receiver<ProgressSnapshot>, json: bool) {
    let mut bar: Option<ProgressManager> = None;

    while let Some(snapshot) = progress_rx.recv().await {
        if json {
            JsonMessage::Progress(snapshot).emit();
            continue;
        }

        let bar = bar.get_or_insert_with(|| ProgressManager::new(snapshot.total as u64));
        if snapshot.is_done() {
            bar.finish(&snapshot.message());
        } else {
            bar.update(snapshot.processed as u64, &snapshot.message());
        }
    }
}
