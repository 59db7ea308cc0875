//! Fixed-width bank-return file decoding
//!
//! A return file is a sequence of 400-character Latin-1 lines. The
//! first character discriminates the record type: `0` header, `1`
//! detail, `9` trailer. Detail fields sit at fixed byte offsets;
//! amounts are zero-padded integer minor units, dates are DDMMYY.
//! Decoding is deliberately tolerant: a bad amount decodes to zero, a
//! bad date to none, and a line that cannot be decoded at all becomes a
//! per-line error without failing the rest of the file.

pub mod reference;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use crate::tables::ReferenceTables;
use crate::types::{RecordType, ReturnRecord, StatementMatchStatus, TitleMatchStatus};

/// Fixed width of every line in a return file
pub const LINE_WIDTH: usize = 400;

/// Decoded file header
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub bank_code: String,
    pub bank_name: String,
    pub file_date: Option<NaiveDate>,
}

/// One decoded detail line, not yet attached to a batch
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLine {
    pub inscription_type: String,
    pub counterparty_tax_id: Option<String>,
    pub internal_reference: String,
    pub occurrence_code: String,
    pub occurrence_description: String,
    pub occurrence_date: Option<NaiveDate>,
    pub your_number: String,
    pub due_date: Option<NaiveDate>,
    pub face_amount: BigDecimal,
    pub fee_amount: BigDecimal,
    pub rebate_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub paid_amount: BigDecimal,
    pub interest_amount: BigDecimal,
    pub credit_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub installment: Option<String>,
    pub raw_line: String,
    pub line_number: u32,
}

impl DetailLine {
    /// Build the persistent record for this detail line inside a batch.
    pub fn into_record(self, batch_id: &str, now: NaiveDateTime) -> ReturnRecord {
        ReturnRecord {
            id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            record_type: RecordType::Detail,
            inscription_type: self.inscription_type,
            counterparty_tax_id: self.counterparty_tax_id,
            internal_reference: self.internal_reference,
            occurrence_code: self.occurrence_code,
            occurrence_description: self.occurrence_description,
            occurrence_date: self.occurrence_date,
            credit_date: self.credit_date,
            your_number: self.your_number,
            due_date: self.due_date,
            face_amount: self.face_amount,
            fee_amount: self.fee_amount,
            rebate_amount: self.rebate_amount,
            discount_amount: self.discount_amount,
            paid_amount: self.paid_amount,
            interest_amount: self.interest_amount,
            invoice_number: self.invoice_number,
            installment: self.installment,
            receivable_id: None,
            statement_line_id: None,
            title_match: TitleMatchStatus::Pending,
            statement_match: StatementMatchStatus::Pending,
            processed: false,
            processed_at: None,
            error: None,
            raw_line: self.raw_line,
            line_number: self.line_number,
            created_at: now,
        }
    }
}

/// A line that could not be decoded; recorded, never fatal
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    pub line_number: u32,
    pub message: String,
}

/// Outcome of decoding a whole file
#[derive(Debug, Clone, Default)]
pub struct DecodedFile {
    pub header: Option<FileHeader>,
    pub details: Vec<DetailLine>,
    pub trailer_seen: bool,
    pub line_errors: Vec<LineError>,
}

/// Decoder for fixed-width bank-return files
///
/// Holds a reference to the shared lookup tables; the decoder itself is
/// stateless.
pub struct ReturnFileDecoder<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> ReturnFileDecoder<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    /// Decode a whole file. Line-level failures are collected in
    /// `line_errors`; they never abort the remaining lines.
    pub fn decode_file(&self, content: &[u8]) -> DecodedFile {
        let mut decoded = DecodedFile::default();
        let mut line_number = 0u32;

        for raw in content.split(|&b| b == b'\n') {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.iter().all(|&b| b == b' ') {
                continue;
            }
            line_number += 1;

            let line = pad_line(raw);
            match line[0] {
                b'0' => decoded.header = Some(self.decode_header(&line)),
                b'1' => decoded.details.push(self.decode_detail(&line, line_number)),
                b'9' => decoded.trailer_seen = true,
                other => decoded.line_errors.push(LineError {
                    line_number,
                    message: format!("unknown record type discriminator '{}'", other as char),
                }),
            }
        }

        decoded
    }

    fn decode_header(&self, line: &[u8]) -> FileHeader {
        let bank_code = field(line, 76, 79);
        FileHeader {
            bank_name: self.tables.bank_name(&bank_code).to_string(),
            bank_code,
            file_date: parse_date(&field(line, 94, 100)),
        }
    }

    fn decode_detail(&self, line: &[u8], line_number: u32) -> DetailLine {
        let occurrence_code = field(line, 108, 110);
        let your_number = field(line, 116, 126);
        let (invoice_number, installment) = match reference::extract_title_reference(&your_number)
        {
            Some((invoice, installment)) => (Some(invoice), Some(installment)),
            None => (None, None),
        };

        DetailLine {
            inscription_type: field(line, 1, 3),
            counterparty_tax_id: parse_tax_id(&field(line, 3, 17)),
            internal_reference: field(line, 70, 82),
            occurrence_description: self
                .tables
                .occurrence_description(&occurrence_code)
                .to_string(),
            occurrence_code,
            occurrence_date: parse_date(&field(line, 110, 116)),
            your_number,
            due_date: parse_date(&field(line, 146, 152)),
            face_amount: parse_amount(&field(line, 152, 165)),
            fee_amount: parse_amount(&field(line, 175, 188)),
            rebate_amount: parse_amount(&field(line, 227, 240)),
            discount_amount: parse_amount(&field(line, 240, 253)),
            paid_amount: parse_amount(&field(line, 253, 266)),
            interest_amount: parse_amount(&field(line, 266, 279)),
            credit_date: parse_date(&field(line, 295, 301)),
            invoice_number,
            installment,
            raw_line: latin1_to_string(line),
            line_number,
        }
    }
}

/// Pad or truncate a raw line to exactly [`LINE_WIDTH`] bytes.
fn pad_line(raw: &[u8]) -> Vec<u8> {
    let mut line = raw.to_vec();
    line.resize(LINE_WIDTH, b' ');
    line
}

/// Latin-1 bytes map one-to-one onto the first 256 Unicode scalars.
fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Extract and trim one fixed-offset field.
fn field(line: &[u8], start: usize, end: usize) -> String {
    latin1_to_string(&line[start..end]).trim().to_string()
}

/// Parse a zero-padded integer-minor-units amount field. Blank or
/// non-numeric fields decode to zero, never fail.
fn parse_amount(raw: &str) -> BigDecimal {
    match raw.trim().parse::<i64>() {
        Ok(cents) => BigDecimal::from(cents) / BigDecimal::from(100),
        Err(_) => BigDecimal::from(0),
    }
}

/// Parse a DDMMYY date field. Two-digit years below 50 map to 20xx,
/// the rest to 19xx. Out-of-range day or month decodes to `None`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day: u32 = raw[0..2].parse().ok()?;
    let month: u32 = raw[2..4].parse().ok()?;
    let yy: i32 = raw[4..6].parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Normalize a tax id field: digits only, blank or all-zero means
/// absent.
fn parse_tax_id(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.chars().all(|c| c == '0') {
        None
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_fixtures::{build_detail_line, build_header_line};
    use std::str::FromStr;

    #[test]
    fn test_detail_round_trip() {
        let tables = ReferenceTables::builtin();
        let decoder = ReturnFileDecoder::new(&tables);
        let line = build_detail_line(
            "06",
            "190126",
            "142941/1  ",
            "0000000177847",
            "200126",
            "12345678000190",
        );

        let decoded = decoder.decode_file(line.as_bytes());
        assert!(decoded.line_errors.is_empty());
        assert_eq!(decoded.details.len(), 1);

        let detail = &decoded.details[0];
        assert_eq!(detail.occurrence_code, "06");
        assert_eq!(detail.occurrence_description, "settled");
        assert_eq!(detail.invoice_number.as_deref(), Some("142941"));
        assert_eq!(detail.installment.as_deref(), Some("1"));
        assert_eq!(detail.paid_amount, BigDecimal::from_str("1778.47").unwrap());
        assert_eq!(detail.face_amount, BigDecimal::from_str("1778.47").unwrap());
        assert_eq!(
            detail.occurrence_date,
            NaiveDate::from_ymd_opt(2026, 1, 19)
        );
        assert_eq!(detail.credit_date, NaiveDate::from_ymd_opt(2026, 1, 20));
        assert_ne!(detail.occurrence_date, detail.credit_date);
        assert_eq!(
            detail.counterparty_tax_id.as_deref(),
            Some("12345678000190")
        );
        assert_eq!(detail.line_number, 1);
    }

    #[test]
    fn test_your_number_without_separator() {
        let tables = ReferenceTables::builtin();
        let decoder = ReturnFileDecoder::new(&tables);
        let line = build_detail_line("06", "190126", "142972", "100", "200126", "0");

        let decoded = decoder.decode_file(line.as_bytes());
        let detail = &decoded.details[0];
        assert_eq!(detail.invoice_number.as_deref(), Some("142972"));
        assert_eq!(detail.installment.as_deref(), Some("1"));
        assert_eq!(detail.counterparty_tax_id, None);
    }

    #[test]
    fn test_blank_amount_decodes_to_zero() {
        assert_eq!(parse_amount(""), BigDecimal::from(0));
        assert_eq!(parse_amount("   "), BigDecimal::from(0));
        assert_eq!(parse_amount("ABC"), BigDecimal::from(0));
        assert_eq!(
            parse_amount("0000000000150"),
            BigDecimal::from_str("1.50").unwrap()
        );
    }

    #[test]
    fn test_date_century_window() {
        assert_eq!(parse_date("190126"), NaiveDate::from_ymd_opt(2026, 1, 19));
        assert_eq!(parse_date("311299"), NaiveDate::from_ymd_opt(1999, 12, 31));
        assert_eq!(parse_date("010149"), NaiveDate::from_ymd_opt(2049, 1, 1));
        assert_eq!(parse_date("010150"), NaiveDate::from_ymd_opt(1950, 1, 1));
    }

    #[test]
    fn test_invalid_date_decodes_to_none() {
        assert_eq!(parse_date("320126"), None);
        assert_eq!(parse_date("191326"), None);
        assert_eq!(parse_date("000000"), None);
        assert_eq!(parse_date("19012"), None);
        assert_eq!(parse_date("19A126"), None);
    }

    #[test]
    fn test_unknown_discriminator_is_line_error() {
        let tables = ReferenceTables::builtin();
        let decoder = ReturnFileDecoder::new(&tables);
        let good = build_detail_line("06", "190126", "1/1", "100", "200126", "0");
        let content = format!("X{}\n{}", " ".repeat(LINE_WIDTH - 1), good);

        let decoded = decoder.decode_file(content.as_bytes());
        assert_eq!(decoded.line_errors.len(), 1);
        assert_eq!(decoded.line_errors[0].line_number, 1);
        assert_eq!(decoded.details.len(), 1);
    }

    #[test]
    fn test_short_line_is_padded() {
        let tables = ReferenceTables::builtin();
        let decoder = ReturnFileDecoder::new(&tables);
        // Truncated right after the your-number field.
        let full = build_detail_line("06", "190126", "55/2", "100", "200126", "0");
        let short = &full[..130];

        let decoded = decoder.decode_file(short.as_bytes());
        let detail = &decoded.details[0];
        assert_eq!(detail.invoice_number.as_deref(), Some("55"));
        assert_eq!(detail.paid_amount, BigDecimal::from(0));
        assert_eq!(detail.credit_date, None);
    }

    #[test]
    fn test_header_decoding() {
        let tables = ReferenceTables::builtin();
        let decoder = ReturnFileDecoder::new(&tables);
        let content = build_header_line();

        let decoded = decoder.decode_file(content.as_bytes());
        let header = decoded.header.expect("header");
        assert_eq!(header.bank_code, "237");
        assert_eq!(header.bank_name, "Bradesco");
        assert_eq!(header.file_date, NaiveDate::from_ymd_opt(2026, 1, 15));
    }
}
