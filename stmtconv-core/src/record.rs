//! Transaction record as held in the ledger

use serde::{Deserialize, Serialize};

/// One statement line, as extracted from the source document.
///
/// `balance` is whatever the statement declares after this transaction; it is
/// never recomputed, only compared against the expectation the validator derives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Unique within a ledger, stable for the record's lifetime
    pub id: String,
    /// ISO date (YYYY-MM-DD); kept as text so edits are stored verbatim
    pub date: String,
    pub description: String,
    /// Amount leaving the account (0 if none)
    #[serde(default)]
    pub debit: f64,
    /// Amount entering the account (0 if none)
    #[serde(default)]
    pub credit: f64,
    /// Declared running balance after this transaction
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// `false` marks the row for human review
    #[serde(default = "default_valid")]
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_valid() -> bool {
    true
}

impl TransactionRecord {
    /// Create a record with no category and the validity flag set.
    pub fn new(
        id: impl Into<String>,
        date: impl Into<String>,
        description: impl Into<String>,
        debit: f64,
        credit: f64,
        balance: f64,
    ) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            description: description.into(),
            debit,
            credit,
            balance,
            category: None,
            is_valid: true,
            notes: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_validity(mut self, is_valid: bool) -> Self {
        self.is_valid = is_valid;
        self
    }

    /// Signed effect on the running balance (credit minus debit).
    pub fn net_change(&self) -> f64 {
        self.credit - self.debit
    }

    /// The semantic date, if the stored text is a valid ISO date.
    pub fn parsed_date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let r = TransactionRecord::new("t1", "2024-01-15", "Grocery store", 42.5, 0.0, 957.5)
            .with_category("Food");
        assert_eq!(r.net_change(), -42.5);
        assert_eq!(r.category.as_deref(), Some("Food"));
        assert!(r.is_valid);
        assert_eq!(
            r.parsed_date(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_serde_uses_camel_case_and_defaults() {
        let json = r#"{"id":"a","date":"2024-02-01","description":"x","balance":10}"#;
        let r: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.debit, 0.0);
        assert_eq!(r.credit, 0.0);
        assert!(r.is_valid);

        let out = serde_json::to_string(&r.with_validity(false)).unwrap();
        assert!(out.contains("\"isValid\":false"));
        assert!(!out.contains("category"));
    }

    #[test]
    fn test_unparseable_date_is_none() {
        let r = TransactionRecord::new("t1", "15 Jan", "x", 0.0, 0.0, 0.0);
        assert!(r.parsed_date().is_none());
    }
}
