//! In-memory ledger with immutable, one-field-at-a-time edits
//!
//! Every edit produces a fresh `Ledger`; the previous snapshot stays untouched,
//! so a reader holding it (validator, exporter) never sees a half-applied edit.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::LedgerError;
use crate::record::TransactionRecord;
use crate::validator::{self, BalanceSummary, ChainBreak};

/// Editable cell of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Date,
    Description,
    Debit,
    Credit,
    Balance,
    Category,
    Notes,
}

impl EditField {
    pub const TABLE: [EditField; 6] = [
        EditField::Date,
        EditField::Description,
        EditField::Debit,
        EditField::Credit,
        EditField::Balance,
        EditField::Category,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            EditField::Date => "date",
            EditField::Description => "description",
            EditField::Debit => "debit",
            EditField::Credit => "credit",
            EditField::Balance => "balance",
            EditField::Category => "category",
            EditField::Notes => "notes",
        }
    }

    pub fn is_amount(&self) -> bool {
        matches!(self, EditField::Debit | EditField::Credit | EditField::Balance)
    }

    /// Current value of this field rendered as editable text.
    pub fn current_text(&self, record: &TransactionRecord) -> String {
        match self {
            EditField::Date => record.date.clone(),
            EditField::Description => record.description.clone(),
            EditField::Debit => record.debit.to_string(),
            EditField::Credit => record.credit.to_string(),
            EditField::Balance => record.balance.to_string(),
            EditField::Category => record.category.clone().unwrap_or_default(),
            EditField::Notes => record.notes.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EditField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(EditField::Date),
            "description" => Ok(EditField::Description),
            "debit" => Ok(EditField::Debit),
            "credit" => Ok(EditField::Credit),
            "balance" => Ok(EditField::Balance),
            "category" => Ok(EditField::Category),
            "notes" => Ok(EditField::Notes),
            other => Err(LedgerError::UnknownField(other.to_string())),
        }
    }
}

/// What to do when an amount edit does not parse as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Store 0 in place of the unparseable input
    #[default]
    CoerceToZero,
    /// Refuse the edit and keep the prior value
    Reject,
}

/// Parse user-entered amount text. Whitespace is trimmed; non-finite values
/// count as unparseable.
pub fn parse_amount(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ordered, shareable snapshot of the current records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Arc<Vec<TransactionRecord>>,
}

impl Ledger {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TransactionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn position(&self, id: &str) -> Result<usize, LedgerError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| LedgerError::RecordNotFound(id.to_string()))
    }

    /// Replace one field of one record, coercing bad amounts to 0.
    pub fn update_field(&self, id: &str, field: EditField, value: &str) -> Result<Ledger, LedgerError> {
        self.update_field_with(id, field, value, NumericPolicy::CoerceToZero)
    }

    /// Replace one field of one record under an explicit amount policy.
    pub fn update_field_with(
        &self,
        id: &str,
        field: EditField,
        value: &str,
        policy: NumericPolicy,
    ) -> Result<Ledger, LedgerError> {
        let idx = self.position(id)?;

        let amount = if field.is_amount() {
            match (parse_amount(value), policy) {
                (Some(v), _) => v,
                (None, NumericPolicy::CoerceToZero) => {
                    log::debug!("coercing unparseable {field} {value:?} on {id} to 0");
                    0.0
                }
                (None, NumericPolicy::Reject) => {
                    return Err(LedgerError::InvalidAmount {
                        field: field.key(),
                        value: value.to_string(),
                    });
                }
            }
        } else {
            0.0
        };

        let mut records = self.records.as_ref().clone();
        let rec = &mut records[idx];
        match field {
            EditField::Date => rec.date = value.to_string(),
            EditField::Description => rec.description = value.to_string(),
            EditField::Debit => rec.debit = amount,
            EditField::Credit => rec.credit = amount,
            EditField::Balance => rec.balance = amount,
            EditField::Category => rec.category = Some(value.to_string()),
            EditField::Notes => rec.notes = Some(value.to_string()),
        }

        Ok(Ledger::new(records))
    }

    /// Set the review flag of one record.
    pub fn set_validity(&self, id: &str, is_valid: bool) -> Result<Ledger, LedgerError> {
        let idx = self.position(id)?;
        let mut records = self.records.as_ref().clone();
        records[idx].is_valid = is_valid;
        Ok(Ledger::new(records))
    }

    pub fn summary(&self) -> Option<BalanceSummary> {
        validator::validate(&self.records)
    }

    pub fn chain_breaks(&self) -> Vec<ChainBreak> {
        validator::chain_breaks(&self.records)
    }

    pub fn valid_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_valid).count()
    }

    pub fn needs_review_count(&self) -> usize {
        self.len() - self.valid_count()
    }
}

/// Holder of the current ledger snapshot.
#[derive(Debug, Default)]
pub struct LedgerStore {
    current: Ledger,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, records: Vec<TransactionRecord>) {
        self.current = Ledger::new(records);
    }

    /// Cheap clone of the current snapshot.
    pub fn snapshot(&self) -> Ledger {
        self.current.clone()
    }

    pub fn current(&self) -> &Ledger {
        &self.current
    }

    pub fn apply(&mut self, id: &str, field: EditField, value: &str, policy: NumericPolicy) -> Result<(), LedgerError> {
        self.current = self.current.update_field_with(id, field, value, policy)?;
        Ok(())
    }

    pub fn set_validity(&mut self, id: &str, is_valid: bool) -> Result<(), LedgerError> {
        self.current = self.current.set_validity(id, is_valid)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current = Ledger::default();
    }
}
