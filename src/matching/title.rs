//! Title matching: linking a record to the receivable it settles

use bigdecimal::BigDecimal;
use tracing::{debug, warn};

use crate::tables::ReferenceTables;
use crate::traits::ReceivableStore;
use crate::types::*;

/// Matcher that resolves a record's extracted identifier pair to an
/// open receivable across the configured legal entities
///
/// Entities are tried in their configured order and the first hit wins;
/// the order is significant and fixed, not a tie-break heuristic.
pub struct TitleMatcher<R: ReceivableStore> {
    receivables: R,
    entity_order: Vec<LegalEntity>,
    amount_epsilon: BigDecimal,
    tables: ReferenceTables,
}

impl<R: ReceivableStore> TitleMatcher<R> {
    pub fn new(
        receivables: R,
        entity_order: Vec<LegalEntity>,
        amount_epsilon: BigDecimal,
        tables: ReferenceTables,
    ) -> Self {
        Self {
            receivables,
            entity_order,
            amount_epsilon,
            tables,
        }
    }

    /// Evaluate the title side of a record, updating its status in
    /// place. Returns the receivable when one was found, whether open
    /// or already paid, so statement matching can use it.
    pub async fn match_record(
        &self,
        record: &mut ReturnRecord,
    ) -> ReconResult<Option<Receivable>> {
        if !self.tables.is_liquidation(&record.occurrence_code) {
            record.title_match = TitleMatchStatus::NotApplicable;
            record.statement_match = StatementMatchStatus::NotApplicable;
            return Ok(None);
        }

        let (invoice, installment) = match (&record.invoice_number, &record.installment) {
            (Some(invoice), Some(installment)) => (invoice.clone(), installment.clone()),
            _ => {
                record.title_match = TitleMatchStatus::InvalidFormat;
                record.statement_match = StatementMatchStatus::NotApplicable;
                return Ok(None);
            }
        };

        let mut found = None;
        for entity in &self.entity_order {
            if let Some(receivable) = self
                .receivables
                .find_by_title(*entity, &invoice, &installment)
                .await?
            {
                found = Some(receivable);
                break;
            }
        }

        let receivable = match found {
            Some(receivable) => receivable,
            None => {
                debug!(
                    record_id = %record.id,
                    invoice = %invoice,
                    installment = %installment,
                    "no receivable found; forwarding to statement-only matching"
                );
                record.title_match = TitleMatchStatus::NoMatch;
                return Ok(None);
            }
        };

        let divergence = (&receivable.amount - &record.face_amount).abs();
        if divergence > self.amount_epsilon {
            // Non-fatal: the bank may return the title net of rebates.
            warn!(
                record_id = %record.id,
                receivable_id = %receivable.id,
                receivable_amount = %receivable.amount,
                face_amount = %record.face_amount,
                "amount divergence between receivable and return record"
            );
        }

        record.receivable_id = Some(receivable.id.clone());
        record.title_match = if receivable.paid {
            TitleMatchStatus::AlreadyPaid {
                score: 100,
                criterion: TitleCriterion::Exact,
            }
        } else {
            TitleMatchStatus::Matched {
                score: 100,
                criterion: TitleCriterion::Exact,
            }
        };

        Ok(Some(receivable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use crate::utils::test_fixtures::{liquidation_record, open_receivable};

    fn matcher(storage: MemoryStorage) -> TitleMatcher<MemoryStorage> {
        TitleMatcher::new(
            storage,
            LegalEntity::default_matching_order(),
            BigDecimal::new(1.into(), 2),
            ReferenceTables::builtin(),
        )
    }

    #[tokio::test]
    async fn test_exact_match_on_first_entity() {
        let storage = MemoryStorage::new();
        let receivable = open_receivable(LegalEntity::Freight, "142941", "1");
        storage.insert_receivable(receivable.clone());

        let mut record = liquidation_record("142941", "1");
        let found = matcher(storage).match_record(&mut record).await.unwrap();

        assert_eq!(found.unwrap().id, receivable.id);
        assert_eq!(record.receivable_id.as_deref(), Some(receivable.id.as_str()));
        assert_eq!(
            record.title_match,
            TitleMatchStatus::Matched {
                score: 100,
                criterion: TitleCriterion::Exact
            }
        );
    }

    #[tokio::test]
    async fn test_entity_order_first_match_wins() {
        let storage = MemoryStorage::new();
        let freight = open_receivable(LegalEntity::Freight, "5000", "1");
        let logistics = open_receivable(LegalEntity::Logistics, "5000", "1");
        storage.insert_receivable(freight.clone());
        storage.insert_receivable(logistics);

        let mut record = liquidation_record("5000", "1");
        let found = matcher(storage).match_record(&mut record).await.unwrap();

        // Freight comes first in the configured order.
        assert_eq!(found.unwrap().entity, LegalEntity::Freight);
        assert_eq!(record.receivable_id.as_deref(), Some(freight.id.as_str()));
    }

    #[tokio::test]
    async fn test_later_entity_is_searched() {
        let storage = MemoryStorage::new();
        let warehouse = open_receivable(LegalEntity::Warehouse, "6000", "2");
        storage.insert_receivable(warehouse.clone());

        let mut record = liquidation_record("6000", "2");
        let found = matcher(storage).match_record(&mut record).await.unwrap();

        assert_eq!(found.unwrap().id, warehouse.id);
    }

    #[tokio::test]
    async fn test_non_liquidation_code_not_applicable() {
        let storage = MemoryStorage::new();
        let mut record = liquidation_record("142941", "1");
        record.occurrence_code = "02".to_string();

        let found = matcher(storage).match_record(&mut record).await.unwrap();

        assert!(found.is_none());
        assert_eq!(record.title_match, TitleMatchStatus::NotApplicable);
        assert_eq!(record.statement_match, StatementMatchStatus::NotApplicable);
    }

    #[tokio::test]
    async fn test_missing_identifier_invalid_format() {
        let storage = MemoryStorage::new();
        let mut record = liquidation_record("142941", "1");
        record.invoice_number = None;
        record.installment = None;

        let found = matcher(storage).match_record(&mut record).await.unwrap();

        assert!(found.is_none());
        assert_eq!(record.title_match, TitleMatchStatus::InvalidFormat);
    }

    #[tokio::test]
    async fn test_no_receivable_is_no_match() {
        let storage = MemoryStorage::new();
        let mut record = liquidation_record("999999", "1");

        let found = matcher(storage).match_record(&mut record).await.unwrap();

        assert!(found.is_none());
        assert_eq!(record.title_match, TitleMatchStatus::NoMatch);
        // Statement side stays pending: the statement-only path runs next.
        assert_eq!(record.statement_match, StatementMatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_paid_receivable_tagged_already_paid() {
        let storage = MemoryStorage::new();
        let mut receivable = open_receivable(LegalEntity::Freight, "142941", "1");
        receivable.paid = true;
        storage.insert_receivable(receivable.clone());

        let mut record = liquidation_record("142941", "1");
        let found = matcher(storage).match_record(&mut record).await.unwrap();

        assert!(found.is_some());
        assert!(matches!(
            record.title_match,
            TitleMatchStatus::AlreadyPaid { score: 100, .. }
        ));
    }
}
