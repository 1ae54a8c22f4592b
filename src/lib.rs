//! # Media Shrink Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `classify`: Classificazione dei file per contenuto (mai per estensione)
//! - `strategy`: Selezione della strategia di compressione per candidato
//! - `tools`: Rilevamento degli encoder esterni disponibili
//! - `walker`: Discovery pigra dei file nelle root
//! - `executor`: Esecuzione dell'encoder esterno con timeout
//! - `commit`: Validazione e sostituzione atomica dell'originale
//! - `scheduler`: Worker pool e aggregazione degli esiti
//! - `report`: Statistiche di run e riepilogo finale
//! - `progress`: Progress tracking
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use media_shrink::{Config, Scheduler, Toolbox};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config {
//!     roots: vec!["/path/to/media".into()],
//!     ..Default::default()
//! };
//! let toolbox = Toolbox::detect().await;
//! let mut scheduler = Scheduler::new(config, toolbox);
//! let stats = scheduler.run().await?;
//! println!("{}", stats.format_report());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod commit;
pub mod config;
pub mod error;
pub mod executor;
pub mod progress;
pub mod report;
pub mod scheduler;
pub mod strategy;
pub mod tools;
pub mod utils;
pub mod walker;

pub use classify::{Candidate, Container, MediaKind};
pub use config::Config;
pub use error::ShrinkError;
pub use report::{JobOutcome, RunStats, SkipReason};
pub use scheduler::Scheduler;
pub use strategy::Strategy;
pub use tools::{Tool, Toolbox};
