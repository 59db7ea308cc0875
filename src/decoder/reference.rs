//! Invoice/installment extraction from the free-text your-number field
//!
//! The field is written by the billing system as
//! `<invoice><separator><installment>` with `/` or `-` as separator.
//! Files from older billing versions carry the invoice number alone;
//! those default to installment 1.

use once_cell::sync::Lazy;
use regex::Regex;

static INVOICE_INSTALLMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[/-](\d+)$").expect("invoice/installment pattern"));

static INVOICE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("invoice pattern"));

/// Extract an (invoice number, installment) pair from a your-number
/// field. The installment's leading zeros are stripped. A field that
/// fits neither form yields `None`; that is not an error, the record
/// is tagged invalid-format downstream.
pub fn extract_title_reference(your_number: &str) -> Option<(String, String)> {
    let trimmed = your_number.trim();

    if let Some(captures) = INVOICE_INSTALLMENT.captures(trimmed) {
        let invoice = captures[1].to_string();
        let installment = captures[2].trim_start_matches('0');
        let installment = if installment.is_empty() {
            "0".to_string()
        } else {
            installment.to_string()
        };
        return Some((invoice, installment));
    }

    if INVOICE_ONLY.is_match(trimmed) {
        return Some((trimmed.to_string(), "1".to_string()));
    }

    None
}
