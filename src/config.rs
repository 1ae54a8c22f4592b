//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri della pipeline
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Verifica che le root esistano e siano scrivibili prima di iniziare
//!
//! ## Parametri di configurazione:
//! - `roots`: Directory (o file) da scandire
//! - `exclude`: Glob di esclusione (directory escluse non vengono visitate)
//! - `jpeg_quality` / `webp_quality`: Qualità immagini (1-100, default: 80)
//! - `video_crf`: CRF video (0-51, default: 26, più basso = migliore qualità)
//! - `audio_bitrate`: Bitrate audio (default: "128k")
//! - `max_height`: Limite di risoluzione verticale per i video (default: nessuno)
//! - `size_ratio`: Soglia per sostituire file (0.0-1.0, default: 0.9)
//! - `min_file_size`: Dimensione minima in byte per considerare un file (default: 1024)
//! - `workers`: Numero di worker paralleli (default: numero di CPU)
//! - `timeout_secs`: Timeout per singolo job (default: 900)
//! - `dry_run`: Simulazione senza modifiche (default: false)
//! - `strict`: Exit code non-zero se un job fallisce (default: false)
//!
//! La validazione avviene una volta sola all'avvio: una configurazione non
//! valida è l'unico errore fatale dell'applicazione.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the shrink pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root paths to scan (directories or single files)
    pub roots: Vec<PathBuf>,
    /// Exclusion globs, matched against paths and file names
    pub exclude: Vec<String>,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// WebP quality (1-100)
    pub webp_quality: u8,
    /// Video CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    /// Audio bitrate for re-encoded audio tracks
    pub audio_bitrate: String,
    /// Maximum video height; larger videos are scaled down
    pub max_height: Option<u32>,
    /// Size ratio (replace only if new size < original * ratio)
    pub size_ratio: f64,
    /// Files smaller than this are never processed
    pub min_file_size: u64,
    /// Number of parallel workers
    pub workers: usize,
    /// Per-job timeout in seconds
    pub timeout_secs: u64,
    /// Dry run - classify and plan only, never write
    pub dry_run: bool,
    /// Exit non-zero if any job failed
    pub strict: bool,
    /// Print the final summary as JSON
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            exclude: Vec::new(),
            max_depth: None,
            follow_symlinks: false,
            jpeg_quality: 80,
            webp_quality: 80,
            video_crf: 26,
            audio_bitrate: "128k".to_string(),
            max_height: None,
            size_ratio: 0.9,
            min_file_size: 1024,
            workers: num_cpus::get(),
            timeout_secs: 900,
            dry_run: false,
            strict: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be between 1 and 100"));
        }

        if self.webp_quality == 0 || self.webp_quality > 100 {
            return Err(anyhow::anyhow!("WebP quality must be between 1 and 100"));
        }

        if self.video_crf > 51 {
            return Err(anyhow::anyhow!("Video CRF must be between 0 and 51"));
        }

        if self.size_ratio <= 0.0 || self.size_ratio > 1.0 {
            return Err(anyhow::anyhow!("Size ratio must be between 0.0 and 1.0"));
        }

        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Job timeout must be greater than 0"));
        }

        for pattern in &self.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(anyhow::anyhow!("Invalid exclude pattern `{}`: {}", pattern, e));
            }
        }

        Ok(())
    }

    /// Verify that every root exists and that temporary files can be created
    /// next to the originals. Called once before any work starts; failures
    /// here are the only fatal errors of a run.
    pub fn ensure_roots(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(anyhow::anyhow!("At least one root path is required"));
        }

        for root in &self.roots {
            if !root.exists() {
                return Err(anyhow::anyhow!("Root path does not exist: {}", root.display()));
            }

            let dir = if root.is_dir() {
                root.clone()
            } else {
                root.parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."))
            };

            // Replacements happen via rename next to the original, so the
            // directory itself must accept new files.
            if !self.dry_run {
                tempfile::Builder::new()
                    .prefix(".media-shrink-probe")
                    .tempfile_in(&dir)
                    .map_err(|e| {
                        anyhow::anyhow!("Root directory is not writable: {} ({})", dir.display(), e)
                    })?;
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.jpeg_quality = 80;
        config.video_crf = 52;
        assert!(config.validate().is_err());

        config.video_crf = 26;
        config.size_ratio = 1.5;
        assert!(config.validate().is_err());

        config.size_ratio = 0.9;
        config.exclude = vec!["[".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.video_crf, 26);
        assert_eq!(config.audio_bitrate, "128k");
        assert_eq!(config.size_ratio, 0.9);
        assert_eq!(config.min_file_size, 1024);
        assert!(!config.dry_run);
        assert!(config.workers > 0);
    }

    #[test]
    fn test_ensure_roots() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = Config::default();
        assert!(config.ensure_roots().is_err(), "empty root set must be fatal");

        config.roots = vec![temp_dir.path().to_path_buf()];
        assert!(config.ensure_roots().is_ok());

        config.roots = vec![temp_dir.path().join("missing")];
        assert!(config.ensure_roots().is_err());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            jpeg_quality: 85,
            video_crf: 24,
            audio_bitrate: "192k".to_string(),
            size_ratio: 0.85,
            dry_run: true,
            workers: 8,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.jpeg_quality, 85);
        assert_eq!(loaded_config.video_crf, 24);
        assert_eq!(loaded_config.audio_bitrate, "192k");
        assert_eq!(loaded_config.size_ratio, 0.85);
        assert!(loaded_config.dry_run);
        assert_eq!(loaded_config.workers, 8);
    }
}
