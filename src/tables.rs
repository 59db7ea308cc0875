//! Immutable reference tables loaded once at process start
//!
//! Occurrence-code and bank-code lookups are built into a single
//! [`ReferenceTables`] value and passed by reference into the decoder;
//! nothing mutates them afterwards.

use std::collections::HashMap;

/// Occurrence codes that mean the title was actually collected.
/// `06` liquidation, `09`/`10` automatic or instructed settlement.
const LIQUIDATION_CODES: [&str; 3] = ["06", "09", "10"];

/// Shared code → description and bank lookup tables
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    occurrences: HashMap<&'static str, &'static str>,
    banks: HashMap<&'static str, &'static str>,
}

impl ReferenceTables {
    /// Build the fixed production tables.
    pub fn builtin() -> Self {
        let occurrences = HashMap::from([
            ("02", "entry confirmed"),
            ("03", "entry rejected"),
            ("06", "settled"),
            ("09", "settled automatically"),
            ("10", "settled per instruction"),
            ("12", "rebate granted"),
            ("14", "due date changed"),
            ("19", "protest instruction confirmed"),
            ("23", "title sent to protest"),
        ]);
        let banks = HashMap::from([
            ("001", "Banco do Brasil"),
            ("033", "Santander"),
            ("104", "Caixa Economica Federal"),
            ("237", "Bradesco"),
            ("341", "Itau Unibanco"),
            ("748", "Sicredi"),
        ]);
        Self { occurrences, banks }
    }

    /// Description for an occurrence code, "unknown occurrence" when the
    /// code is not mapped.
    pub fn occurrence_description(&self, code: &str) -> &'static str {
        self.occurrences.get(code).copied().unwrap_or("unknown occurrence")
    }

    /// Bank name for a clearing code, "unknown bank" when not mapped.
    pub fn bank_name(&self, code: &str) -> &'static str {
        self.banks.get(code).copied().unwrap_or("unknown bank")
    }

    /// Whether an occurrence code represents a settlement event eligible
    /// for matching.
    pub fn is_liquidation(&self, code: &str) -> bool {
        LIQUIDATION_CODES.contains(&code)
    }
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liquidation_codes() {
        let tables = ReferenceTables::builtin();
        assert!(tables.is_liquidation("06"));
        assert!(tables.is_liquidation("09"));
        assert!(tables.is_liquidation("10"));
        assert!(!tables.is_liquidation("02"));
        assert!(!tables.is_liquidation("19"));
    }

    #[test]
    fn test_unmapped_codes_get_defaults() {
        let tables = ReferenceTables::builtin();
        assert_eq!(tables.occurrence_description("99"), "unknown occurrence");
        assert_eq!(tables.occurrence_description("06"), "settled");
        assert_eq!(tables.bank_name("999"), "unknown bank");
        assert_eq!(tables.bank_name("237"), "Bradesco");
    }
}
