//! Traits for storage abstraction and external collaborators
//!
//! The engine reaches every external system through one of these narrow
//! contracts: its own batch/record persistence, the receivables ledger,
//! the bank-statement table, and the external general-ledger service.
//! Any backend (PostgreSQL, MySQL, in-memory, etc.) can plug in by
//! implementing them.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::*;

/// Persistence for batches and their records
#[async_trait]
pub trait BatchStorage: Send + Sync {
    /// Save a newly created batch
    async fn save_batch(&mut self, batch: &ReturnBatch) -> ReconResult<()>;

    /// Get a batch by id
    async fn get_batch(&self, batch_id: &str) -> ReconResult<Option<ReturnBatch>>;

    /// Find a batch by its content hash (primary duplicate guard)
    async fn find_batch_by_hash(&self, content_hash: &str) -> ReconResult<Option<ReturnBatch>>;

    /// Find a batch by (filename, bank code, file date) — the secondary
    /// duplicate guard against re-imports that hash differently due to
    /// encoding noise
    async fn find_batch_by_file(
        &self,
        filename: &str,
        bank_code: &str,
        file_date: Option<NaiveDate>,
    ) -> ReconResult<Option<ReturnBatch>>;

    /// Update an existing batch (counters, status, error text)
    async fn update_batch(&mut self, batch: &ReturnBatch) -> ReconResult<()>;

    /// Save a newly decoded record
    async fn save_record(&mut self, record: &ReturnRecord) -> ReconResult<()>;

    /// Update a record in place as matching and settlement proceed
    async fn update_record(&mut self, record: &ReturnRecord) -> ReconResult<()>;

    /// All records belonging to a batch, in line order
    async fn get_batch_records(&self, batch_id: &str) -> ReconResult<Vec<ReturnRecord>>;

    /// Id of the record currently holding a link to the given statement
    /// line, if any. This query enforces the one-record-per-line
    /// invariant; matchers call it again at match time, not only when
    /// candidates are first read.
    async fn record_holding_statement(
        &self,
        statement_line_id: &str,
    ) -> ReconResult<Option<String>>;
}

/// Read/write access to the receivables ledger
///
/// The engine never creates or deletes receivables through this trait.
#[async_trait]
pub trait ReceivableStore: Send + Sync {
    /// Find a receivable by its title identifier within one legal
    /// entity, whether open or already paid
    async fn find_by_title(
        &self,
        entity: LegalEntity,
        invoice_number: &str,
        installment: &str,
    ) -> ReconResult<Option<Receivable>>;

    /// Get a receivable by id
    async fn get(&self, receivable_id: &str) -> ReconResult<Option<Receivable>>;

    /// Persist the paid flag, payment status tag and note
    async fn update(&mut self, receivable: &Receivable) -> ReconResult<()>;
}

/// Candidate search criteria for statement matching
#[derive(Debug, Clone)]
pub struct StatementQuery {
    /// Credit-posting date of the settlement
    pub date: NaiveDate,
    /// Paid amount; matched within `epsilon`
    pub amount: bigdecimal::BigDecimal,
    pub epsilon: bigdecimal::BigDecimal,
    /// Whether already-reconciled lines are eligible (true only for
    /// already-paid records, to preserve the historical link)
    pub include_reconciled: bool,
}

/// Read/write access to imported bank-statement lines
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Incoming lines matching the query by date and amount. The
    /// anti-duplicate filter is applied by the caller on top of this.
    async fn find_candidates(&self, query: &StatementQuery) -> ReconResult<Vec<StatementLine>>;

    /// Get a line by id
    async fn get_line(&self, line_id: &str) -> ReconResult<Option<StatementLine>>;

    /// Persist reconciliation status and display fields
    async fn update_line(&mut self, line: &StatementLine) -> ReconResult<()>;
}

/// External general-ledger reconciliation service
///
/// The only network-bound collaborator. A failure here must leave all
/// local state untouched; the engine attaches the error text to the
/// record and moves on to the next one.
#[async_trait]
pub trait LedgerReconciler: Send + Sync {
    /// Push the reconciliation of a statement line against a receivable
    /// to the external ledger
    async fn reconcile(&self, line: &StatementLine, receivable: &Receivable) -> ReconResult<()>;
}
