//! Shared fixtures for the unit test modules

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use crate::decoder::LINE_WIDTH;
use crate::types::*;

pub const FIXTURE_TAX_ID: &str = "12345678000190";

pub fn put(line: &mut [u8], offset: usize, value: &str) {
    line[offset..offset + value.len()].copy_from_slice(value.as_bytes());
}

/// A 400-char header line for bank 237 dated 2026-01-15.
pub fn build_header_line() -> String {
    let mut line = vec![b' '; LINE_WIDTH];
    line[0] = b'0';
    put(&mut line, 76, "237");
    put(&mut line, 94, "150126");
    String::from_utf8(line).unwrap()
}

/// A synthetic 400-char detail line with the given fields at their
/// fixed offsets. Face amount is fixed at 1778.47.
pub fn build_detail_line(
    occurrence_code: &str,
    occurrence_date: &str,
    your_number: &str,
    paid_amount: &str,
    credit_date: &str,
    tax_id: &str,
) -> String {
    let mut line = vec![b' '; LINE_WIDTH];
    line[0] = b'1';
    put(&mut line, 1, "02");
    put(&mut line, 3, &format!("{:0>14}", tax_id));
    put(&mut line, 70, "000000112345");
    put(&mut line, 108, occurrence_code);
    put(&mut line, 110, occurrence_date);
    put(&mut line, 116, your_number);
    put(&mut line, 146, "150126");
    put(&mut line, 152, "0000000177847");
    put(&mut line, 253, &format!("{:0>13}", paid_amount));
    put(&mut line, 295, credit_date);
    put(&mut line, 394, "000002");
    String::from_utf8(line).unwrap()
}

/// An open receivable for 1778.47 due 2026-01-15.
pub fn open_receivable(entity: LegalEntity, invoice_number: &str, installment: &str) -> Receivable {
    Receivable {
        id: uuid::Uuid::new_v4().to_string(),
        entity,
        invoice_number: invoice_number.to_string(),
        installment: installment.to_string(),
        amount: BigDecimal::from_str("1778.47").unwrap(),
        due_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        counterparty_tax_id: Some(FIXTURE_TAX_ID.to_string()),
        counterparty_name: "Acme Cargo Ltda".to_string(),
        paid: false,
        payment_status: None,
        note: String::new(),
    }
}

/// A pending liquidation record (occurrence 06, credited 2026-01-20,
/// paid 1778.47) not yet run through any matcher.
pub fn liquidation_record(invoice_number: &str, installment: &str) -> ReturnRecord {
    let amount = BigDecimal::from_str("1778.47").unwrap();
    ReturnRecord {
        id: uuid::Uuid::new_v4().to_string(),
        batch_id: uuid::Uuid::new_v4().to_string(),
        record_type: RecordType::Detail,
        inscription_type: "02".to_string(),
        counterparty_tax_id: Some(FIXTURE_TAX_ID.to_string()),
        internal_reference: "000000112345".to_string(),
        occurrence_code: "06".to_string(),
        occurrence_description: "settled".to_string(),
        occurrence_date: NaiveDate::from_ymd_opt(2026, 1, 19),
        credit_date: NaiveDate::from_ymd_opt(2026, 1, 20),
        your_number: format!("{invoice_number}/{installment}"),
        due_date: NaiveDate::from_ymd_opt(2026, 1, 15),
        face_amount: amount.clone(),
        fee_amount: BigDecimal::from(0),
        rebate_amount: BigDecimal::from(0),
        discount_amount: BigDecimal::from(0),
        paid_amount: amount,
        interest_amount: BigDecimal::from(0),
        invoice_number: Some(invoice_number.to_string()),
        installment: Some(installment.to_string()),
        receivable_id: None,
        statement_line_id: None,
        title_match: TitleMatchStatus::Pending,
        statement_match: StatementMatchStatus::Pending,
        processed: false,
        processed_at: None,
        error: None,
        raw_line: String::new(),
        line_number: 2,
        created_at: chrono::Utc::now().naive_utc(),
    }
}

/// A liquidation record whose title side already matched.
pub fn matched_record(invoice_number: &str, installment: &str) -> ReturnRecord {
    let mut record = liquidation_record(invoice_number, installment);
    record.title_match = TitleMatchStatus::Matched {
        score: 100,
        criterion: TitleCriterion::Exact,
    };
    record
}

/// An unreconciled incoming statement line.
pub fn incoming_line(date: NaiveDate, amount: &str, tax_id: Option<&str>) -> StatementLine {
    StatementLine {
        id: uuid::Uuid::new_v4().to_string(),
        transaction_date: date,
        amount: BigDecimal::from_str(amount).unwrap(),
        incoming: true,
        counterparty_tax_id: tax_id.map(str::to_string),
        reconciled: false,
        match_score: None,
        match_criterion: None,
        external_feed: false,
        invoice_number: None,
        installment: None,
        receivable_amount: None,
        receivable_due_date: None,
        counterparty_name: None,
    }
}
