//! # Scheduler Module
//!
//! Questo è il coordinatore di concorrenza dell'intera pipeline.
//!
//! ## Responsabilità:
//! - Consuma pigramente il Walker, classifica e seleziona inline
//! - Smista i candidati senza strategia in esiti Skipped senza dispatch
//! - Dispatch dei job su un pool limitato da semaforo
//! - Backpressure: il walker avanza solo quando un permit si libera
//! - Aggregazione degli esiti via canale mpsc verso un unico consumer
//! - Cancellazione: un segnale di stop ferma il dispatch, i job in volo
//!   finiscono (o scadono per timeout) e il riepilogo resta best-effort
//!
//! ## Flusso per ogni worker:
//! 1. Executor: encoder esterno verso il path temporaneo privato del job
//! 2. Commit layer: validazione e rename atomico, oppure scarto
//! 3. Invio dell'unico `JobOutcome` del job all'aggregatore
//!
//! Ogni candidato produce esattamente un esito, qualunque cosa accada.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::classify::{self, Candidate, MediaKind};
use crate::commit::{self, CommitOutcome};
use crate::config::Config;
use crate::executor;
use crate::progress::ProgressManager;
use crate::report::{JobOutcome, RunStats, SkipReason};
use crate::strategy::{self, Strategy};
use crate::tools::Toolbox;
use crate::walker::Walker;

/// One candidate paired with its strategy and private temporary output path
struct Job {
    candidate: Candidate,
    strategy: Strategy,
    temp: tempfile::TempPath,
}

/// Bounded-concurrency pipeline coordinator
pub struct Scheduler {
    config: Arc<Config>,
    toolbox: Arc<Toolbox>,
    stop_tx: broadcast::Sender<()>,
    stop_rx: broadcast::Receiver<()>,
}

impl Scheduler {
    pub fn new(config: Config, toolbox: Toolbox) -> Self {
        let (stop_tx, stop_rx) = broadcast::channel(1);
        Self {
            config: Arc::new(config),
            toolbox: Arc::new(toolbox),
            stop_tx,
            stop_rx,
        }
    }

    /// Handle used to request cancellation (typically wired to Ctrl-C)
    pub fn stop_handle(&self) -> broadcast::Sender<()> {
        self.stop_tx.clone()
    }

    fn should_stop(&mut self) -> bool {
        matches!(
            self.stop_rx.try_recv(),
            Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_))
        )
    }

    /// Run the full discovery → classify → execute → commit pipeline.
    ///
    /// Only configuration problems are returned as errors; everything that
    /// goes wrong with an individual file is contained in its outcome.
    pub async fn run(&mut self) -> Result<RunStats> {
        self.config.validate()?;
        self.config.ensure_roots()?;

        info!("{}", self.toolbox.report());
        if self.config.dry_run {
            info!("dry run: nothing will be written");
        }

        let walker = Walker::new(&self.config)?;
        let progress = ProgressManager::new();

        let (outcome_tx, outcome_rx) = mpsc::channel::<JobOutcome>(self.config.workers * 2);
        let aggregator = tokio::spawn(aggregate(outcome_rx, progress.clone()));

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = Vec::new();

        for path in walker.iter() {
            if self.should_stop() {
                info!("stop requested, no new jobs will be dispatched");
                break;
            }

            let candidate = match classify::candidate_for(path.clone()).await {
                Ok(candidate) => candidate,
                Err(error) => {
                    warn!("cannot inspect `{}`: {}", path.display(), error);
                    send(&outcome_tx, JobOutcome::Failed { path, error: error.to_string() }).await;
                    continue;
                }
            };

            if candidate.kind == MediaKind::Unknown {
                send(&outcome_tx, skip(candidate, SkipReason::UnknownKind)).await;
                continue;
            }

            if candidate.size < self.config.min_file_size {
                send(&outcome_tx, skip(candidate, SkipReason::BelowMinSize)).await;
                continue;
            }

            let Some(strategy) =
                strategy::select(candidate.kind, candidate.container, &self.config, &self.toolbox)
            else {
                send(&outcome_tx, skip(candidate, SkipReason::NoStrategy)).await;
                continue;
            };

            if self.config.dry_run {
                info!(
                    "would run `{}` on `{}`",
                    strategy.describe(),
                    candidate.path.display()
                );
                send(&outcome_tx, skip(candidate, SkipReason::DryRun)).await;
                continue;
            }

            let temp = match make_temp(&candidate, &strategy) {
                Ok(temp) => temp,
                Err(error) => {
                    send(
                        &outcome_tx,
                        JobOutcome::Failed {
                            path: candidate.path,
                            error: error.to_string(),
                        },
                    )
                    .await;
                    continue;
                }
            };

            // Backpressure: discovery halts here until a worker slot frees
            let permit = semaphore.clone().acquire_owned().await?;
            let job = Job {
                candidate,
                strategy,
                temp,
            };
            let config = self.config.clone();
            let toolbox = self.toolbox.clone();
            let tx = outcome_tx.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = run_job(job, &config, &toolbox).await;
                send(&tx, outcome).await;
            }));
        }

        drop(outcome_tx);
        for task in tasks {
            if let Err(error) = task.await {
                warn!("worker task aborted: {}", error);
            }
        }

        let stats = aggregator.await?;
        progress.finish(&stats.format_summary());

        Ok(stats)
    }
}

/// Execute and commit one job, translating every error into its outcome
async fn run_job(job: Job, config: &Config, toolbox: &Toolbox) -> JobOutcome {
    let Job {
        candidate,
        strategy,
        temp,
    } = job;

    debug!(
        "processing `{}` ({}, {} bytes)",
        candidate.path.display(),
        candidate.kind,
        candidate.size
    );

    let timeout = Duration::from_secs(config.timeout_secs);
    if let Err(error) =
        executor::execute(&strategy, toolbox, &candidate.path, &temp, timeout).await
    {
        // Dropping `temp` removes the partial output
        return JobOutcome::Failed {
            path: candidate.path,
            error: error.to_string(),
        };
    }

    match commit::commit(
        &candidate.path,
        candidate.size,
        temp,
        strategy.expects,
        config.size_ratio,
    )
    .await
    {
        Ok(CommitOutcome::Replaced { new_size }) => JobOutcome::Shrunk {
            path: candidate.path,
            original_size: candidate.size,
            new_size,
        },
        Ok(CommitOutcome::NotSmaller { .. }) => JobOutcome::Skipped {
            path: candidate.path,
            reason: SkipReason::NotSmallerEnough,
        },
        Err(error) => JobOutcome::Failed {
            path: candidate.path,
            error: error.to_string(),
        },
    }
}

/// Create the job's uniquely named temporary output next to the original,
/// so the later rename never crosses a filesystem boundary
fn make_temp(candidate: &Candidate, strategy: &Strategy) -> std::io::Result<tempfile::TempPath> {
    let parent = candidate
        .path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ".".into());

    let temp = tempfile::Builder::new()
        .prefix(".media-shrink-")
        .suffix(&format!(".{}", strategy.container.extension()))
        .tempfile_in(parent)?;

    Ok(temp.into_temp_path())
}

fn skip(candidate: Candidate, reason: SkipReason) -> JobOutcome {
    JobOutcome::Skipped {
        path: candidate.path,
        reason,
    }
}

async fn send(tx: &mpsc::Sender<JobOutcome>, outcome: JobOutcome) {
    // The aggregator lives until every sender is dropped; a send can only
    // fail if the whole run is being torn down
    if tx.send(outcome).await.is_err() {
        warn!("outcome aggregator is gone, result dropped");
    }
}

/// Single consumer of every worker's outcome; the only writer of RunStats
async fn aggregate(mut rx: mpsc::Receiver<JobOutcome>, progress: ProgressManager) -> RunStats {
    let mut stats = RunStats::new();
    while let Some(outcome) = rx.recv().await {
        progress.update(&outcome.progress_message());
        stats.record(outcome);
    }
    stats
}
