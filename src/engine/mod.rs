//! Batch orchestration: the public entry point of the engine
//!
//! One import is one sequential pass over the file's records, each
//! fully resolved (title match, statement match, settlement) before the
//! next begins. Later records depend on the statement links made by
//! earlier ones, so there is no record-level parallelism.

use bigdecimal::BigDecimal;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::decoder::ReturnFileDecoder;
use crate::matching::{StatementMatcher, TitleMatcher};
use crate::settlement::{SettlementAutomator, SettlementOutcome};
use crate::tables::ReferenceTables;
use crate::traits::{BatchStorage, LedgerReconciler, ReceivableStore, StatementStore};
use crate::types::*;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Legal entities tried during title matching, in order; first
    /// match wins
    pub entity_order: Vec<LegalEntity>,
    /// Tolerance for statement amount candidates and for the title
    /// amount-divergence warning
    pub amount_epsilon: BigDecimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_order: LegalEntity::default_matching_order(),
            amount_epsilon: BigDecimal::new(1.into(), 2),
        }
    }
}

/// Outcome of a reprocessing pass over a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReprocessSummary {
    pub newly_matched: u32,
    pub still_unmatched: u32,
}

/// Reconciliation engine orchestrating decode, matching and settlement
///
/// Generic over its four collaborators; clones of the handles are held
/// by the matchers and the settlement automator, so storage handles
/// must share state across clones (the in-memory implementation and
/// any connection-pool backend do).
pub struct ReconciliationEngine<S, R, T, L>
where
    S: BatchStorage + Clone,
    R: ReceivableStore + Clone,
    T: StatementStore + Clone,
    L: LedgerReconciler,
{
    storage: S,
    title_matcher: TitleMatcher<R>,
    statement_matcher: StatementMatcher<T, S>,
    settlement: SettlementAutomator<R, T, S, L>,
    tables: ReferenceTables,
}

impl<S, R, T, L> ReconciliationEngine<S, R, T, L>
where
    S: BatchStorage + Clone,
    R: ReceivableStore + Clone,
    T: StatementStore + Clone,
    L: LedgerReconciler,
{
    /// Create an engine with the default configuration.
    pub fn new(storage: S, receivables: R, statements: T, ledger: L) -> Self {
        Self::with_config(storage, receivables, statements, ledger, EngineConfig::default())
    }

    /// Create an engine with a custom entity order and epsilon.
    pub fn with_config(
        storage: S,
        receivables: R,
        statements: T,
        ledger: L,
        config: EngineConfig,
    ) -> Self {
        let tables = ReferenceTables::builtin();
        Self {
            title_matcher: TitleMatcher::new(
                receivables.clone(),
                config.entity_order.clone(),
                config.amount_epsilon.clone(),
                tables.clone(),
            ),
            statement_matcher: StatementMatcher::new(
                statements.clone(),
                storage.clone(),
                config.amount_epsilon.clone(),
            ),
            settlement: SettlementAutomator::new(receivables, statements, storage.clone(), ledger),
            storage,
            tables,
        }
    }

    /// Import one return file: decode it, create the batch and its
    /// records, and run matching and settlement over every record.
    ///
    /// Fails only on duplicate content, a duplicate
    /// (filename, bank, date) triple, or a missing header; every
    /// record-level problem is recorded on the record and the import
    /// continues.
    pub async fn import_file(
        &mut self,
        content: &[u8],
        filename: &str,
        actor: &str,
    ) -> ReconResult<ReturnBatch> {
        let content_hash = hex::encode(Sha256::digest(content));
        if let Some(prior) = self.storage.find_batch_by_hash(&content_hash).await? {
            return Err(ReconError::DuplicateFile(prior.id));
        }

        let decoded = ReturnFileDecoder::new(&self.tables).decode_file(content);
        let header = decoded
            .header
            .ok_or_else(|| ReconError::MalformedFile("missing header record".to_string()))?;

        // Secondary guard: same file re-exported with encoding noise
        // hashes differently but keeps its (filename, bank, date).
        if let Some(prior) = self
            .storage
            .find_batch_by_file(filename, &header.bank_code, header.file_date)
            .await?
        {
            return Err(ReconError::DuplicateFile(prior.id));
        }

        let mut batch = ReturnBatch::new(
            filename.to_string(),
            header.bank_code,
            header.bank_name,
            header.file_date,
            content_hash,
            actor.to_string(),
        );
        if !decoded.line_errors.is_empty() {
            let lines: Vec<String> = decoded
                .line_errors
                .iter()
                .map(|e| format!("line {}: {}", e.line_number, e.message))
                .collect();
            batch.error = Some(lines.join("; "));
        }
        self.storage.save_batch(&batch).await?;

        info!(
            batch_id = %batch.id,
            filename,
            bank = %batch.bank_code,
            details = decoded.details.len(),
            "return file imported, processing records"
        );

        let now = chrono::Utc::now().naive_utc();
        for detail in decoded.details {
            let mut record = detail.into_record(&batch.id, now);
            self.storage.save_record(&record).await?;
            self.process_record(&mut record).await?;
            self.storage.update_record(&record).await?;
        }

        let batch = self.refresh_batch(&batch.id).await?;
        info!(
            batch_id = %batch.id,
            total = batch.total_records,
            matched = batch.matched_records,
            unmatched = batch.unmatched_records,
            already_paid = batch.already_paid_records,
            settled_amount = %batch.settled_amount,
            status = ?batch.status,
            "batch processing finished"
        );
        Ok(batch)
    }

    /// Re-run matching for records still unmatched on the title side
    /// and not yet processed. Used after new receivables arrive; never
    /// reopens a processed record.
    pub async fn reprocess_unmatched(&mut self, batch_id: &str) -> ReconResult<ReprocessSummary> {
        let batch = self
            .storage
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| ReconError::BatchNotFound(batch_id.to_string()))?;

        let mut summary = ReprocessSummary {
            newly_matched: 0,
            still_unmatched: 0,
        };
        for mut record in self.storage.get_batch_records(&batch.id).await? {
            if record.processed || !record.title_match.is_unmatched() {
                continue;
            }
            self.process_record(&mut record).await?;
            self.storage.update_record(&record).await?;
            if record.title_match.has_title() {
                summary.newly_matched += 1;
            } else {
                summary.still_unmatched += 1;
            }
        }

        self.refresh_batch(&batch.id).await?;
        info!(
            batch_id = %batch.id,
            newly_matched = summary.newly_matched,
            still_unmatched = summary.still_unmatched,
            "reprocessing finished"
        );
        Ok(summary)
    }

    /// Title match, then statement match, then settlement, each step
    /// gated on the previous one.
    async fn process_record(&mut self, record: &mut ReturnRecord) -> ReconResult<()> {
        let receivable = self.title_matcher.match_record(record).await?;

        // NoMatch still goes through the statement-only path so the
        // bank movement stays traceable without a local title.
        match record.title_match {
            TitleMatchStatus::NotApplicable | TitleMatchStatus::InvalidFormat => return Ok(()),
            _ => {}
        }

        let line = self
            .statement_matcher
            .match_record(record, receivable.as_ref())
            .await?;

        if matches!(record.title_match, TitleMatchStatus::Matched { .. }) && line.is_some() {
            match self.settlement.settle(record).await? {
                SettlementOutcome::ExternalFailure => {
                    // Retryable; the batch keeps going.
                    debug!(record_id = %record.id, "settlement deferred after external failure");
                }
                SettlementOutcome::Settled | SettlementOutcome::NotEligible => {}
            }
        }
        Ok(())
    }

    /// Recompute batch counters from its records and derive the batch
    /// status.
    async fn refresh_batch(&mut self, batch_id: &str) -> ReconResult<ReturnBatch> {
        let mut batch = self
            .storage
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| ReconError::BatchNotFound(batch_id.to_string()))?;
        let records = self.storage.get_batch_records(batch_id).await?;

        batch.total_records = records.len() as u32;
        batch.matched_records = records
            .iter()
            .filter(|r| matches!(r.title_match, TitleMatchStatus::Matched { .. }))
            .count() as u32;
        batch.unmatched_records = records
            .iter()
            .filter(|r| r.title_match.is_unmatched())
            .count() as u32;
        batch.already_paid_records = records
            .iter()
            .filter(|r| matches!(r.title_match, TitleMatchStatus::AlreadyPaid { .. }))
            .count() as u32;
        batch.settled_amount = records
            .iter()
            .filter(|r| r.processed)
            .map(|r| r.paid_amount.clone())
            .sum();
        batch.status = if batch.unmatched_records > 0 {
            BatchStatus::AwaitingReview
        } else {
            BatchStatus::Approved
        };

        self.storage.update_batch(&batch).await?;
        Ok(batch)
    }
}
