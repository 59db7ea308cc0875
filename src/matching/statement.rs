//! Statement matching: linking a record to the bank movement that paid it
//!
//! Resolution is tiered, highest confidence first:
//!
//! 1. a line already carrying the matched receivable's identifier
//!    (score 100),
//! 2. exact counterparty tax id equality (100 with a local title, 95
//!    without),
//! 3. same 8-digit tax id root, i.e. same corporate group (95),
//! 4. a single date+amount candidate with no tax id signal (85 with a
//!    local title, 60 without),
//! 5. zero or several equally valid candidates: no link, ever.
//!
//! A statement line may be held by at most one record. The ownership
//! query runs again for every surviving candidate at match time, not
//! only when candidates are first read, because links made by earlier
//! records in the same pass must be observed.

use bigdecimal::BigDecimal;
use tracing::{debug, warn};

use crate::traits::{BatchStorage, StatementQuery, StatementStore};
use crate::types::*;

/// Matcher that resolves a record to the statement line that
/// economically corresponds to its settlement
pub struct StatementMatcher<T: StatementStore, B: BatchStorage> {
    statements: T,
    records: B,
    amount_epsilon: BigDecimal,
}

impl<T: StatementStore, B: BatchStorage> StatementMatcher<T, B> {
    pub fn new(statements: T, records: B, amount_epsilon: BigDecimal) -> Self {
        Self {
            statements,
            records,
            amount_epsilon,
        }
    }

    /// Evaluate the statement side of a record, updating its status in
    /// place. `receivable` is the title-side match when one exists.
    pub async fn match_record(
        &self,
        record: &mut ReturnRecord,
        receivable: Option<&Receivable>,
    ) -> ReconResult<Option<StatementLine>> {
        let credit_date = match record.credit_date {
            Some(date) => date,
            None => {
                record.statement_match = StatementMatchStatus::NoMatch;
                return Ok(None);
            }
        };

        // Already-paid records may relink to lines reconciled in the
        // past; pending records only see open lines.
        let include_reconciled =
            matches!(record.title_match, TitleMatchStatus::AlreadyPaid { .. });

        let query = StatementQuery {
            date: credit_date,
            amount: record.paid_amount.clone(),
            epsilon: self.amount_epsilon.clone(),
            include_reconciled,
        };

        let mut candidates = Vec::new();
        for line in self.statements.find_candidates(&query).await? {
            match self.records.record_holding_statement(&line.id).await? {
                Some(holder) if holder != record.id => continue,
                _ => candidates.push(line),
            }
        }

        if candidates.is_empty() {
            record.statement_match = StatementMatchStatus::NoMatch;
            return Ok(None);
        }

        let has_title = record.title_match.has_title();

        // Tier 1: a line that already carries the receivable's identifier.
        if let Some(receivable) = receivable {
            let prior: Vec<&StatementLine> = candidates
                .iter()
                .filter(|line| {
                    line.invoice_number.as_deref() == Some(receivable.invoice_number.as_str())
                        && line.installment.as_deref() == Some(receivable.installment.as_str())
                })
                .collect();
            if prior.len() == 1 {
                let line = prior[0].clone();
                return Ok(Some(self.link(record, line, 100, StatementCriterion::PriorLink)));
            }
        }

        // Tiers 2 and 3: counterparty tax id, exact then root.
        if let Some(tax_id) = record.counterparty_tax_id.clone() {
            let exact: Vec<&StatementLine> = candidates
                .iter()
                .filter(|line| line.counterparty_tax_id.as_deref() == Some(tax_id.as_str()))
                .collect();
            match exact.len() {
                1 => {
                    let score = if has_title { 100 } else { 95 };
                    let line = exact[0].clone();
                    return Ok(Some(self.link(
                        record,
                        line,
                        score,
                        StatementCriterion::TaxIdExact,
                    )));
                }
                n if n > 1 => return Ok(self.ambiguous(record, n)),
                _ => {}
            }

            if tax_id.len() >= 8 {
                let root = &tax_id[..8];
                let same_root: Vec<&StatementLine> = candidates
                    .iter()
                    .filter(|line| {
                        line.counterparty_tax_id
                            .as_deref()
                            .is_some_and(|id| id.len() >= 8 && &id[..8] == root)
                    })
                    .collect();
                match same_root.len() {
                    1 => {
                        let line = same_root[0].clone();
                        return Ok(Some(self.link(
                            record,
                            line,
                            95,
                            StatementCriterion::TaxIdRoot,
                        )));
                    }
                    n if n > 1 => return Ok(self.ambiguous(record, n)),
                    _ => {}
                }
            }

            // Tax id present but no candidate carries it: never guess.
            record.statement_match = StatementMatchStatus::NoMatch;
            return Ok(None);
        }

        // Tier 4: no tax id signal at all; a single date+amount
        // candidate is accepted at reduced confidence.
        match candidates.len() {
            1 => {
                let (score, criterion) = if has_title {
                    (85, StatementCriterion::SingleCandidate)
                } else {
                    (60, StatementCriterion::SingleCandidateUnvalidated)
                };
                let line = candidates.remove(0);
                Ok(Some(self.link(record, line, score, criterion)))
            }
            n => Ok(self.ambiguous(record, n)),
        }
    }

    fn link(
        &self,
        record: &mut ReturnRecord,
        line: StatementLine,
        score: u8,
        criterion: StatementCriterion,
    ) -> StatementLine {
        debug!(
            record_id = %record.id,
            statement_line_id = %line.id,
            score,
            ?criterion,
            "statement line linked"
        );
        record.statement_line_id = Some(line.id.clone());
        record.statement_match = StatementMatchStatus::Matched { score, criterion };
        line
    }

    fn ambiguous(&self, record: &mut ReturnRecord, candidates: usize) -> Option<StatementLine> {
        warn!(
            record_id = %record.id,
            candidates,
            "ambiguous statement match, refusing to link"
        );
        record.statement_match = StatementMatchStatus::Ambiguous { candidates };
        None
    }
}
