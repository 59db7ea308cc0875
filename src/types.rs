//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Legal entities that can hold receivables, tried in a fixed order
/// during title matching (first match wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegalEntity {
    /// Freight forwarding company (primary entity)
    Freight,
    /// Logistics operations company
    Logistics,
    /// Warehousing company
    Warehouse,
}

impl LegalEntity {
    /// The fixed production matching order. First match wins; the order
    /// is configuration, not alphabetical.
    pub fn default_matching_order() -> Vec<LegalEntity> {
        vec![
            LegalEntity::Freight,
            LegalEntity::Logistics,
            LegalEntity::Warehouse,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LegalEntity::Freight => "freight",
            LegalEntity::Logistics => "logistics",
            LegalEntity::Warehouse => "warehouse",
        }
    }
}

/// Lifecycle status of an imported batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// File decoded and records created, processing in progress
    Imported,
    /// At least one record is unmatched on the title side
    AwaitingReview,
    /// Every applicable record found its receivable
    Approved,
}

/// How a record was linked to its receivable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleCriterion {
    /// Exact (entity, invoice, installment) lookup
    Exact,
}

/// Title-side match state of a record
///
/// One of the two independent state machines on a record. Data-carrying
/// variants keep the score and criterion next to the state they belong
/// to, so an unmatched record cannot carry a stale score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleMatchStatus {
    /// Not yet evaluated
    Pending,
    /// Occurrence code is not a liquidation code
    NotApplicable,
    /// No invoice/installment pair could be extracted from the
    /// your-number field
    InvalidFormat,
    /// No open receivable found in any configured entity
    NoMatch,
    /// Receivable found and open
    Matched { score: u8, criterion: TitleCriterion },
    /// Receivable found but already settled; kept linked for audit
    AlreadyPaid { score: u8, criterion: TitleCriterion },
}

impl TitleMatchStatus {
    /// True for records still eligible for a later reprocessing pass.
    pub fn is_unmatched(&self) -> bool {
        matches!(
            self,
            TitleMatchStatus::NoMatch | TitleMatchStatus::InvalidFormat
        )
    }

    /// True when a receivable is linked, whether open or already paid.
    pub fn has_title(&self) -> bool {
        matches!(
            self,
            TitleMatchStatus::Matched { .. } | TitleMatchStatus::AlreadyPaid { .. }
        )
    }
}

/// How a record was linked to its statement line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementCriterion {
    /// The line already carried the matched receivable's identifier
    PriorLink,
    /// Exact counterparty tax id equality
    TaxIdExact,
    /// Same 8-digit tax id root (same corporate group)
    TaxIdRoot,
    /// Single date+amount candidate, no tax id signal
    SingleCandidate,
    /// Single date+amount candidate for a record with no local title
    SingleCandidateUnvalidated,
}

/// Statement-side match state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementMatchStatus {
    /// Not yet evaluated
    Pending,
    /// Record never reached statement matching (wrong occurrence code
    /// or unparseable identifier)
    NotApplicable,
    /// No candidate survived the filters
    NoMatch,
    /// More than one equally valid candidate; never linked
    Ambiguous { candidates: usize },
    /// Statement line linked
    Matched { score: u8, criterion: StatementCriterion },
}

impl StatementMatchStatus {
    pub fn is_matched(&self) -> bool {
        matches!(self, StatementMatchStatus::Matched { .. })
    }
}

/// Record type discriminator, first character of each line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    Header,
    Detail,
    Trailer,
}

/// One imported settlement file and its aggregate outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnBatch {
    /// Unique identifier for the batch
    pub id: String,
    /// Original filename as uploaded
    pub filename: String,
    /// Clearing code of the issuing bank
    pub bank_code: String,
    /// Bank name resolved from the reference tables
    pub bank_name: String,
    /// File generation date from the header
    pub file_date: Option<NaiveDate>,
    /// SHA-256 of the raw file bytes; unique across all batches
    pub content_hash: String,
    /// Total detail records decoded
    pub total_records: u32,
    /// Records matched to an open receivable
    pub matched_records: u32,
    /// Records unmatched on the title side (no-match or bad identifier)
    pub unmatched_records: u32,
    /// Records whose receivable was already settled
    pub already_paid_records: u32,
    /// Sum of paid amounts over processed records
    pub settled_amount: BigDecimal,
    pub status: BatchStatus,
    /// Who triggered the import
    pub actor: String,
    /// Batch-level diagnostic text
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
}

impl ReturnBatch {
    pub fn new(
        filename: String,
        bank_code: String,
        bank_name: String,
        file_date: Option<NaiveDate>,
        content_hash: String,
        actor: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename,
            bank_code,
            bank_name,
            file_date,
            content_hash,
            total_records: 0,
            matched_records: 0,
            unmatched_records: 0,
            already_paid_records: 0,
            settled_amount: BigDecimal::from(0),
            status: BatchStatus::Imported,
            actor,
            error: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// One decoded settlement line within a batch
///
/// Created once per detail line, then mutated in place as matching and
/// settlement proceed. Immutable once `processed` is set, except for
/// diagnostic fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: String,
    /// Owning batch
    pub batch_id: String,
    pub record_type: RecordType,
    /// Counterparty inscription type (natural/juridical person code)
    pub inscription_type: String,
    /// Payer fiscal identifier, digits only
    pub counterparty_tax_id: Option<String>,
    /// Bank-internal reference for the collected title
    pub internal_reference: String,
    /// Occurrence code from the bank, e.g. "06" for settlement
    pub occurrence_code: String,
    /// Description resolved from the reference tables
    pub occurrence_description: String,
    pub occurrence_date: Option<NaiveDate>,
    /// Date the funds were posted; distinct from the occurrence date
    /// and used for statement matching
    pub credit_date: Option<NaiveDate>,
    /// Raw your-number field before identifier extraction
    pub your_number: String,
    pub due_date: Option<NaiveDate>,
    pub face_amount: BigDecimal,
    pub fee_amount: BigDecimal,
    pub rebate_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub paid_amount: BigDecimal,
    pub interest_amount: BigDecimal,
    /// Invoice number extracted from the your-number field
    pub invoice_number: Option<String>,
    /// Installment number, leading zeros stripped, defaults to "1"
    pub installment: Option<String>,
    /// Matched receivable, if any
    pub receivable_id: Option<String>,
    /// Linked statement line, if any; at most one live record may hold
    /// a given line id
    pub statement_line_id: Option<String>,
    pub title_match: TitleMatchStatus,
    pub statement_match: StatementMatchStatus,
    /// Set once settlement completed; the record is frozen afterwards
    pub processed: bool,
    pub processed_at: Option<NaiveDateTime>,
    /// Record-level diagnostic text (decode or settlement failures)
    pub error: Option<String>,
    /// Raw 400-character line for diagnostics
    pub raw_line: String,
    /// 1-based position in the source file
    pub line_number: u32,
    pub created_at: NaiveDateTime,
}

/// An open invoice/installment owed to the company (external ledger
/// entity, reached through [`crate::traits::ReceivableStore`])
///
/// The engine never creates or deletes a receivable; it only flips the
/// paid flag, sets the payment status tag and appends to the note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receivable {
    pub id: String,
    pub entity: LegalEntity,
    pub invoice_number: String,
    pub installment: String,
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
    pub counterparty_tax_id: Option<String>,
    pub counterparty_name: String,
    pub paid: bool,
    /// Free-form status tag maintained by the receivables ledger
    pub payment_status: Option<String>,
    /// Append-only free text; settlement provenance lands here
    pub note: String,
}

/// One bank account movement from an imported statement (external
/// entity, reached through [`crate::traits::StatementStore`])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub id: String,
    pub transaction_date: NaiveDate,
    pub amount: BigDecimal,
    /// True for incoming movements; only incoming lines are candidates
    pub incoming: bool,
    pub counterparty_tax_id: Option<String>,
    /// Set once the line has been reconciled against a receivable
    pub reconciled: bool,
    pub match_score: Option<u8>,
    pub match_criterion: Option<StatementCriterion>,
    /// Line originates from an external bank feed; settlement must push
    /// the reconciliation to the external ledger first
    pub external_feed: bool,
    // Receivable-derived display fields, back-filled at settlement.
    pub invoice_number: Option<String>,
    pub installment: Option<String>,
    pub receivable_amount: Option<BigDecimal>,
    pub receivable_due_date: Option<NaiveDate>,
    pub counterparty_name: Option<String>,
}

/// Errors that can occur in the reconciliation engine
///
/// Only `DuplicateFile` and `MalformedFile` abort an import; every
/// record-level outcome is a structured status on the record instead.
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("duplicate file: content already imported as batch {0}")]
    DuplicateFile(String),
    #[error("malformed file: {0}")]
    MalformedFile(String),
    #[error("batch not found: {0}")]
    BatchNotFound(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("external reconciliation failed: {0}")]
    ExternalReconciliation(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;
