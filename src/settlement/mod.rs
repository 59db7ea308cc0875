//! Automatic settlement of fully matched records
//!
//! Settlement is a two-phase local/external write with a single
//! rollback point: when the statement line comes from an external bank
//! feed, the external ledger is called first and nothing local is
//! persisted until it succeeds. A failed external call leaves the
//! record unprocessed and retryable.

use tracing::{debug, info};

use crate::traits::{BatchStorage, LedgerReconciler, ReceivableStore, StatementStore};
use crate::types::*;

/// Outcome of a settlement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Receivable paid, statement line reconciled, record processed
    Settled,
    /// Record is missing a link, already processed, or already paid
    NotEligible,
    /// External ledger rejected the reconciliation; no local state was
    /// touched and the record stays retryable
    ExternalFailure,
}

/// Automator that settles a record once both matches exist
pub struct SettlementAutomator<R, T, B, L>
where
    R: ReceivableStore,
    T: StatementStore,
    B: BatchStorage,
    L: LedgerReconciler,
{
    receivables: R,
    statements: T,
    storage: B,
    ledger: L,
}

impl<R, T, B, L> SettlementAutomator<R, T, B, L>
where
    R: ReceivableStore,
    T: StatementStore,
    B: BatchStorage,
    L: LedgerReconciler,
{
    pub fn new(receivables: R, statements: T, storage: B, ledger: L) -> Self {
        Self {
            receivables,
            statements,
            storage,
            ledger,
        }
    }

    /// Settle one record. Steps are strictly ordered so the local
    /// ledger is never marked paid when the external system rejects the
    /// reconciliation.
    pub async fn settle(&mut self, record: &mut ReturnRecord) -> ReconResult<SettlementOutcome> {
        if record.processed {
            return Ok(SettlementOutcome::NotEligible);
        }
        // Already-paid titles keep their statement link for audit but
        // the receivable is never re-marked.
        if !matches!(record.title_match, TitleMatchStatus::Matched { .. }) {
            return Ok(SettlementOutcome::NotEligible);
        }
        let (receivable_id, line_id) = match (&record.receivable_id, &record.statement_line_id) {
            (Some(receivable_id), Some(line_id)) => (receivable_id.clone(), line_id.clone()),
            _ => return Ok(SettlementOutcome::NotEligible),
        };

        let mut receivable = self
            .receivables
            .get(&receivable_id)
            .await?
            .ok_or_else(|| ReconError::Storage(format!("receivable {receivable_id} missing")))?;
        let mut line = self
            .statements
            .get_line(&line_id)
            .await?
            .ok_or_else(|| ReconError::Storage(format!("statement line {line_id} missing")))?;

        // (a) Back-fill the line's display fields on the in-memory copy;
        // persisted only after the external call succeeds.
        if line.invoice_number.is_none() {
            line.invoice_number = Some(receivable.invoice_number.clone());
            line.installment = Some(receivable.installment.clone());
            line.receivable_amount = Some(receivable.amount.clone());
            line.receivable_due_date = Some(receivable.due_date);
            line.counterparty_name = Some(receivable.counterparty_name.clone());
        }

        // (b) External ledger first. On failure nothing local changes.
        if line.external_feed {
            if let Err(error) = self.ledger.reconcile(&line, &receivable).await {
                record.error = Some(error.to_string());
                debug!(
                    record_id = %record.id,
                    statement_line_id = %line.id,
                    %error,
                    "external reconciliation failed, record left unprocessed"
                );
                return Ok(SettlementOutcome::ExternalFailure);
            }
        }

        // (c) Mark the receivable paid with settlement provenance.
        receivable.paid = true;
        receivable.payment_status = Some("settled".to_string());
        if !receivable.note.is_empty() {
            receivable.note.push('\n');
        }
        receivable.note.push_str(&format!(
            "settled via bank return: occurrence {} on {}, amount {}, batch {}",
            record.occurrence_code,
            record
                .credit_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown date".to_string()),
            record.paid_amount,
            record.batch_id,
        ));
        self.receivables.update(&receivable).await?;

        // (d) Mark the statement line reconciled with the match result.
        if let StatementMatchStatus::Matched { score, criterion } = record.statement_match {
            line.match_score = Some(score);
            line.match_criterion = Some(criterion);
        }
        line.reconciled = true;
        self.statements.update_line(&line).await?;

        // (e) Freeze the record.
        record.processed = true;
        record.processed_at = Some(chrono::Utc::now().naive_utc());
        self.storage.update_record(record).await?;

        info!(
            record_id = %record.id,
            receivable_id = %receivable.id,
            statement_line_id = %line.id,
            amount = %record.paid_amount,
            "record settled"
        );
        Ok(SettlementOutcome::Settled)
    }
}
