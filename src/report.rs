//! # Run Statistics and Reporting Module
//!
//! Questo modulo raccoglie gli esiti dei job in statistiche aggregate.
//!
//! ## Responsabilità:
//! - Definisce `JobOutcome` (shrunk / skipped / failed) e `SkipReason`
//! - Accumula `RunStats`: contatori, byte risparmiati, lista dei fallimenti
//! - Formatta il riepilogo finale, umano o JSON
//!
//! Le statistiche sono mutate da un solo task (l'aggregatore dello
//! scheduler): niente lock, un unico writer. Il rendering è lasciato al
//! livello CLI; qui si produce solo la struttura.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::utils::{format_size, reduction_percent};

/// Why a file was scanned but not replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Content did not match any media signature
    UnknownKind,
    /// No strategy for this kind/container (or the tool is missing)
    NoStrategy,
    /// Below the configured minimum file size
    BelowMinSize,
    /// Encoder output did not clear the size ratio
    NotSmallerEnough,
    /// Dry run: planned only, nothing executed
    DryRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownKind => write!(f, "unknown kind"),
            SkipReason::NoStrategy => write!(f, "no strategy"),
            SkipReason::BelowMinSize => write!(f, "below minimum size"),
            SkipReason::NotSmallerEnough => write!(f, "not smaller enough"),
            SkipReason::DryRun => write!(f, "dry run"),
        }
    }
}

/// Terminal result of one candidate, emitted exactly once
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Shrunk {
        path: PathBuf,
        original_size: u64,
        new_size: u64,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
    Failed {
        path: PathBuf,
        error: String,
    },
}

impl JobOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            JobOutcome::Shrunk { path, .. }
            | JobOutcome::Skipped { path, .. }
            | JobOutcome::Failed { path, .. } => path,
        }
    }

    /// Short per-file progress line
    pub fn progress_message(&self) -> String {
        let name = self
            .path()
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        match self {
            JobOutcome::Shrunk {
                original_size,
                new_size,
                ..
            } => format!(
                "✅ {}: {:.1}% saved",
                name,
                reduction_percent(*original_size, *new_size)
            ),
            JobOutcome::Skipped { reason, .. } => format!("⏩ {}: {}", name, reason),
            JobOutcome::Failed { .. } => format!("❌ {}: error", name),
        }
    }
}

/// A failed file with its specific reason, for the final report
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate counters for one full pipeline execution
#[derive(Debug, Default, Serialize)]
pub struct RunStats {
    pub files_scanned: usize,
    pub files_shrunk: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub bytes_original: u64,
    pub bytes_saved: u64,
    pub failures: Vec<Failure>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the totals
    pub fn record(&mut self, outcome: JobOutcome) {
        self.files_scanned += 1;
        match outcome {
            JobOutcome::Shrunk {
                original_size,
                new_size,
                ..
            } => {
                self.files_shrunk += 1;
                self.bytes_original += original_size;
                self.bytes_saved += original_size.saturating_sub(new_size);
            }
            JobOutcome::Skipped { .. } => {
                self.files_skipped += 1;
            }
            JobOutcome::Failed { path, error } => {
                self.files_failed += 1;
                self.failures.push(Failure {
                    path,
                    reason: error,
                });
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.bytes_original > 0 {
            (self.bytes_saved as f64 / self.bytes_original as f64) * 100.0
        } else {
            0.0
        }
    }

    /// One-line summary for the progress bar
    pub fn format_summary(&self) -> String {
        format!(
            "Scanned: {} files | Shrunk: {} | Skipped: {} | Failed: {} | Saved: {} ({:.2}%)",
            self.files_scanned,
            self.files_shrunk,
            self.files_skipped,
            self.files_failed,
            format_size(self.bytes_saved),
            self.overall_reduction_percent()
        )
    }

    /// Full multi-line report, enumerating every failed file
    pub fn format_report(&self) -> String {
        let mut report = self.format_summary();
        for failure in &self.failures {
            report.push_str(&format!(
                "\n  failed: {}: {}",
                failure.path.display(),
                failure.reason
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn path(name: &str) -> PathBuf {
        Path::new("/media").join(name)
    }

    #[test]
    fn test_scenario_accounting() {
        // photo.jpg and clip.mp4 shrink; notes.txt is unknown content and
        // tiny.png is below the minimum size
        let mut stats = RunStats::new();
        stats.record(JobOutcome::Skipped {
            path: path("notes.txt"),
            reason: SkipReason::UnknownKind,
        });
        stats.record(JobOutcome::Skipped {
            path: path("tiny.png"),
            reason: SkipReason::BelowMinSize,
        });
        stats.record(JobOutcome::Shrunk {
            path: path("photo.jpg"),
            original_size: 2_000_000,
            new_size: 1_200_000,
        });
        stats.record(JobOutcome::Shrunk {
            path: path("clip.mp4"),
            original_size: 50_000_000,
            new_size: 30_000_000,
        });

        assert_eq!(stats.files_scanned, 4);
        assert_eq!(stats.files_shrunk, 2);
        assert_eq!(stats.files_skipped, 2);
        assert_eq!(stats.files_failed, 0);
        assert_eq!(stats.bytes_saved, 800_000 + 20_000_000);
        assert!(!stats.has_failures());
    }

    #[test]
    fn test_failures_are_enumerated() {
        let mut stats = RunStats::new();
        stats.record(JobOutcome::Failed {
            path: path("broken.mp4"),
            error: "`ffmpeg` exit status: 1: moov atom not found".to_string(),
        });

        assert!(stats.has_failures());
        let report = stats.format_report();
        assert!(report.contains("broken.mp4"));
        assert!(report.contains("moov atom not found"));
    }

    #[test]
    fn test_json_serialization() {
        let mut stats = RunStats::new();
        stats.record(JobOutcome::Shrunk {
            path: path("a.jpg"),
            original_size: 100,
            new_size: 50,
        });

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["files_scanned"], 1);
        assert_eq!(json["bytes_saved"], 50);
    }

    #[test]
    fn test_progress_messages() {
        let shrunk = JobOutcome::Shrunk {
            path: path("a.jpg"),
            original_size: 1000,
            new_size: 250,
        };
        assert!(shrunk.progress_message().contains("75.0% saved"));

        let skipped = JobOutcome::Skipped {
            path: path("b.gif"),
            reason: SkipReason::NoStrategy,
        };
        assert!(skipped.progress_message().contains("no strategy"));
    }
}
