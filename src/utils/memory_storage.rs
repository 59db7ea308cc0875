//! In-memory implementations of every collaborator for testing and
//! development

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementing batch/record persistence, the
/// receivables ledger and the statement table
///
/// Clones share state, so one instance can serve as all three
/// collaborators of the engine at once.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    batches: Arc<RwLock<HashMap<String, ReturnBatch>>>,
    records: Arc<RwLock<HashMap<String, ReturnRecord>>>,
    receivables: Arc<RwLock<HashMap<String, Receivable>>>,
    lines: Arc<RwLock<HashMap<String, StatementLine>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a receivable (or overwrite an existing one)
    pub fn insert_receivable(&self, receivable: Receivable) {
        self.receivables
            .write()
            .unwrap()
            .insert(receivable.id.clone(), receivable);
    }

    /// Seed a statement line
    pub fn insert_line(&self, line: StatementLine) {
        self.lines.write().unwrap().insert(line.id.clone(), line);
    }

    /// Seed a record directly, bypassing the engine
    pub fn insert_record(&self, record: ReturnRecord) {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn batch(&self, batch_id: &str) -> Option<ReturnBatch> {
        self.batches.read().unwrap().get(batch_id).cloned()
    }

    pub fn receivable(&self, receivable_id: &str) -> Option<Receivable> {
        self.receivables.read().unwrap().get(receivable_id).cloned()
    }

    pub fn line(&self, line_id: &str) -> Option<StatementLine> {
        self.lines.read().unwrap().get(line_id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.batches.write().unwrap().clear();
        self.records.write().unwrap().clear();
        self.receivables.write().unwrap().clear();
        self.lines.write().unwrap().clear();
    }
}

#[async_trait]
impl BatchStorage for MemoryStorage {
    async fn save_batch(&mut self, batch: &ReturnBatch) -> ReconResult<()> {
        self.batches
            .write()
            .unwrap()
            .insert(batch.id.clone(), batch.clone());
        Ok(())
    }

    async fn get_batch(&self, batch_id: &str) -> ReconResult<Option<ReturnBatch>> {
        Ok(self.batches.read().unwrap().get(batch_id).cloned())
    }

    async fn find_batch_by_hash(&self, content_hash: &str) -> ReconResult<Option<ReturnBatch>> {
        Ok(self
            .batches
            .read()
            .unwrap()
            .values()
            .find(|batch| batch.content_hash == content_hash)
            .cloned())
    }

    async fn find_batch_by_file(
        &self,
        filename: &str,
        bank_code: &str,
        file_date: Option<NaiveDate>,
    ) -> ReconResult<Option<ReturnBatch>> {
        Ok(self
            .batches
            .read()
            .unwrap()
            .values()
            .find(|batch| {
                batch.filename == filename
                    && batch.bank_code == bank_code
                    && batch.file_date == file_date
            })
            .cloned())
    }

    async fn update_batch(&mut self, batch: &ReturnBatch) -> ReconResult<()> {
        if self.batches.read().unwrap().contains_key(&batch.id) {
            self.batches
                .write()
                .unwrap()
                .insert(batch.id.clone(), batch.clone());
            Ok(())
        } else {
            Err(ReconError::BatchNotFound(batch.id.clone()))
        }
    }

    async fn save_record(&mut self, record: &ReturnRecord) -> ReconResult<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_record(&mut self, record: &ReturnRecord) -> ReconResult<()> {
        if self.records.read().unwrap().contains_key(&record.id) {
            self.records
                .write()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Ok(())
        } else {
            Err(ReconError::RecordNotFound(record.id.clone()))
        }
    }

    async fn get_batch_records(&self, batch_id: &str) -> ReconResult<Vec<ReturnRecord>> {
        let mut records: Vec<ReturnRecord> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|record| record.batch_id == batch_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.line_number);
        Ok(records)
    }

    async fn record_holding_statement(
        &self,
        statement_line_id: &str,
    ) -> ReconResult<Option<String>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .find(|record| record.statement_line_id.as_deref() == Some(statement_line_id))
            .map(|record| record.id.clone()))
    }
}

#[async_trait]
impl ReceivableStore for MemoryStorage {
    async fn find_by_title(
        &self,
        entity: LegalEntity,
        invoice_number: &str,
        installment: &str,
    ) -> ReconResult<Option<Receivable>> {
        Ok(self
            .receivables
            .read()
            .unwrap()
            .values()
            .find(|receivable| {
                receivable.entity == entity
                    && receivable.invoice_number == invoice_number
                    && receivable.installment == installment
            })
            .cloned())
    }

    async fn get(&self, receivable_id: &str) -> ReconResult<Option<Receivable>> {
        Ok(self.receivables.read().unwrap().get(receivable_id).cloned())
    }

    async fn update(&mut self, receivable: &Receivable) -> ReconResult<()> {
        if self.receivables.read().unwrap().contains_key(&receivable.id) {
            self.receivables
                .write()
                .unwrap()
                .insert(receivable.id.clone(), receivable.clone());
            Ok(())
        } else {
            Err(ReconError::Storage(format!(
                "receivable {} does not exist",
                receivable.id
            )))
        }
    }
}

#[async_trait]
impl StatementStore for MemoryStorage {
    async fn find_candidates(&self, query: &StatementQuery) -> ReconResult<Vec<StatementLine>> {
        let mut candidates: Vec<StatementLine> = self
            .lines
            .read()
            .unwrap()
            .values()
            .filter(|line| {
                line.incoming
                    && line.transaction_date == query.date
                    && (&line.amount - &query.amount).abs() <= query.epsilon
                    && (query.include_reconciled || !line.reconciled)
            })
            .cloned()
            .collect();
        // Deterministic order for tests and logs.
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(candidates)
    }

    async fn get_line(&self, line_id: &str) -> ReconResult<Option<StatementLine>> {
        Ok(self.lines.read().unwrap().get(line_id).cloned())
    }

    async fn update_line(&mut self, line: &StatementLine) -> ReconResult<()> {
        if self.lines.read().unwrap().contains_key(&line.id) {
            self.lines
                .write()
                .unwrap()
                .insert(line.id.clone(), line.clone());
            Ok(())
        } else {
            Err(ReconError::Storage(format!(
                "statement line {} does not exist",
                line.id
            )))
        }
    }
}

/// Test double for the external general-ledger service
///
/// Counts calls and can be toggled to reject every reconciliation.
#[derive(Debug, Clone, Default)]
pub struct StubLedger {
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicU32>,
}

impl StubLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of reconcile calls received
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerReconciler for StubLedger {
    async fn reconcile(&self, _line: &StatementLine, _receivable: &Receivable) -> ReconResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(ReconError::ExternalReconciliation(
                "ledger rejected the reconciliation".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}
