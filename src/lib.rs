//! # Reconciliation Core
//!
//! A bank-return reconciliation engine: it ingests fixed-width bank
//! settlement files, matches each collected title against open
//! receivables and bank-statement lines, and settles automatically when
//! both matches succeed.
//!
//! ## Features
//!
//! - **Fixed-width decoding**: tolerant 400-character Latin-1 record
//!   decoding with per-line error capture
//! - **Title matching**: invoice/installment lookup across an ordered
//!   list of legal entities
//! - **Statement matching**: tiered confidence scoring with strict
//!   duplicate and ambiguity avoidance
//! - **Automatic settlement**: two-phase local/external write that
//!   never marks the local ledger paid when the external system rejects
//! - **Idempotent imports**: content-hash and filename duplicate guards
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   collaborators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reconciliation_core::{MemoryStorage, ReconciliationEngine, StubLedger};
//!
//! # async fn demo(file_bytes: &[u8]) -> reconciliation_core::ReconResult<()> {
//! let storage = MemoryStorage::new();
//! let mut engine = ReconciliationEngine::new(
//!     storage.clone(),
//!     storage.clone(),
//!     storage,
//!     StubLedger::new(),
//! );
//! let batch = engine.import_file(file_bytes, "retorno.ret", "finance").await?;
//! println!("{:?}: {} records", batch.status, batch.total_records);
//! # Ok(())
//! # }
//! ```

pub mod decoder;
pub mod engine;
pub mod matching;
pub mod settlement;
pub mod tables;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use decoder::{DecodedFile, DetailLine, FileHeader, LineError, ReturnFileDecoder};
pub use engine::{EngineConfig, ReconciliationEngine, ReprocessSummary};
pub use matching::{StatementMatcher, TitleMatcher};
pub use settlement::{SettlementAutomator, SettlementOutcome};
pub use tables::ReferenceTables;
pub use traits::*;
pub use types::*;
pub use utils::{MemoryStorage, StubLedger};
