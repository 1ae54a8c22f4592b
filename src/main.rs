//! # Media Shrink - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Creazione della configurazione e avvio dello scheduler
//! - Cablaggio di Ctrl-C sul segnale di stop della pipeline
//! - Decisione dell'exit code a partire dalle statistiche finali
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-shrink ~/Pictures ~/Videos --exclude '.thumbnails' --workers 8 --strict
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use media_shrink::{Config, Scheduler, Toolbox};

#[derive(Parser)]
#[command(name = "media-shrink")]
#[command(about = "Shrink images, videos and audio in place, keeping originals unless the result is verified smaller")]
struct Args {
    /// Root paths to scan (directories or single files)
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Exclusion globs, matched against paths and file names
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_symlinks: bool,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value = "80")]
    quality: u8,

    /// WebP quality (1-100)
    #[arg(long, default_value = "80")]
    webp_quality: u8,

    /// Video CRF value (0-51, lower = better quality)
    #[arg(short, long, default_value = "26")]
    crf: u8,

    /// Audio bitrate for re-encoded audio tracks
    #[arg(short, long, default_value = "128k")]
    audio_bitrate: String,

    /// Maximum video height; larger videos are scaled down
    #[arg(long)]
    max_height: Option<u32>,

    /// Size ratio (replace only if new size < original * ratio)
    #[arg(short, long, default_value = "0.9")]
    threshold: f64,

    /// Files smaller than this many bytes are never processed
    #[arg(long, default_value = "1024")]
    min_size: u64,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-job timeout in seconds
    #[arg(long, default_value = "900")]
    timeout: u64,

    /// Dry run - classify and plan only, don't touch any file
    #[arg(long)]
    dry_run: bool,

    /// Exit non-zero if any file failed to process
    #[arg(long)]
    strict: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config = Config {
        roots: args.roots,
        exclude: args.exclude,
        max_depth: args.max_depth,
        follow_symlinks: args.follow_symlinks,
        jpeg_quality: args.quality,
        webp_quality: args.webp_quality,
        video_crf: args.crf,
        audio_bitrate: args.audio_bitrate,
        max_height: args.max_height,
        size_ratio: args.threshold,
        min_file_size: args.min_size,
        workers: args.workers.unwrap_or_else(num_cpus::get),
        timeout_secs: args.timeout,
        dry_run: args.dry_run,
        strict: args.strict,
        json_output: args.json,
    };

    let toolbox = Toolbox::detect().await;
    if toolbox.is_empty() && !config.dry_run {
        warn!("no external encoders found; every file will be skipped");
    }

    let mut scheduler = Scheduler::new(config.clone(), toolbox);

    // First Ctrl-C stops dispatching; in-flight jobs finish or time out
    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight jobs");
            let _ = stop.send(());
        }
    });

    let stats = match scheduler.run().await {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json_output {
        match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", stats.format_report());
    }

    if config.strict && stats.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
