//! Running-balance validation
//!
//! The first record's declared balance is taken as a post-transaction value, so
//! the opening balance is backed out of it. Debits and credits are then folded
//! forward from that opening balance and the result compared to the last
//! declared balance.

use serde::Serialize;

use crate::record::TransactionRecord;

/// Absorbs rounding noise from upstream extraction (one minor currency unit).
pub const BALANCE_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Result of checking a ledger's declared balances
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub is_valid: bool,
    /// Balance immediately before the first transaction, `b0 + d0 - c0`.
    ///
    /// This is the first row's balance with its own amounts undone. It is not
    /// `b0 - d0 + c0`, which would apply the first row's amounts a second time.
    pub opening_balance: f64,
    pub expected_balance: f64,
    /// Declared balance of the last record
    pub actual_balance: f64,
    pub difference: f64,
    pub total_transactions: usize,
    pub total_debits: f64,
    pub total_credits: f64,
}

impl BalanceSummary {
    pub fn severity(&self) -> Severity {
        if self.is_valid {
            Severity::Info
        } else {
            Severity::Error
        }
    }

    pub fn headline(&self) -> String {
        if self.is_valid {
            "All balances are consistent".to_string()
        } else {
            format!(
                "Balance mismatch detected: expected {:.2}, declared {:.2}, difference {:.2}",
                self.expected_balance, self.actual_balance, self.difference
            )
        }
    }
}

/// Check the declared balances of an ordered ledger.
///
/// Returns `None` for an empty ledger.
pub fn validate(records: &[TransactionRecord]) -> Option<BalanceSummary> {
    let (first, rest) = records.split_first()?;
    let last = records.last()?;

    let opening = first.balance + first.debit - first.credit;
    // Folding the first record onto `opening` lands back on its declared
    // balance, so start there and keep single-record ledgers exact. Seeding
    // the fold with `b0 - d0 + c0` instead would count the first row twice:
    // an opening row carrying a 15420 debit would report a 15420 mismatch on
    // an otherwise consistent statement.
    let expected = rest
        .iter()
        .fold(first.balance, |acc, r| acc - r.debit + r.credit);

    let difference = (expected - last.balance).abs();

    Some(BalanceSummary {
        is_valid: difference < BALANCE_TOLERANCE,
        opening_balance: opening,
        expected_balance: expected,
        actual_balance: last.balance,
        difference,
        total_transactions: records.len(),
        total_debits: records.iter().map(|r| r.debit).sum(),
        total_credits: records.iter().map(|r| r.credit).sum(),
    })
}

/// A row whose declared balance disagrees with its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBreak {
    pub index: usize,
    pub id: String,
    pub expected_balance: f64,
    pub declared_balance: f64,
}

impl ChainBreak {
    pub fn difference(&self) -> f64 {
        (self.expected_balance - self.declared_balance).abs()
    }
}

/// Row-by-row diagnosis: for each record after the first, compare its declared
/// balance against the previous declared balance adjusted by its own amounts.
pub fn chain_breaks(records: &[TransactionRecord]) -> Vec<ChainBreak> {
    records
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let (prev, cur) = (&pair[0], &pair[1]);
            let expected = prev.balance - cur.debit + cur.credit;
            if (expected - cur.balance).abs() >= BALANCE_TOLERANCE {
                Some(ChainBreak {
                    index: i + 1,
                    id: cur.id.clone(),
                    expected_balance: expected,
                    declared_balance: cur.balance,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, debit: f64, credit: f64, balance: f64) -> TransactionRecord {
        TransactionRecord::new(id, "2024-01-01", id, debit, credit, balance)
    }

    #[test]
    fn test_empty_ledger_has_no_summary() {
        assert!(validate(&[]).is_none());
        assert!(chain_breaks(&[]).is_empty());
    }

    #[test]
    fn test_single_record_always_valid() {
        for r in [
            rec("a", 0.0, 0.0, 1000.0),
            rec("b", 250.0, 0.0, -40.0),
            rec("c", 12.5, 99.0, 0.0),
        ] {
            let s = validate(std::slice::from_ref(&r)).unwrap();
            assert!(s.is_valid);
            assert_eq!(s.difference, 0.0);
            assert_eq!(s.expected_balance, r.balance);
        }
    }

    #[test]
    fn test_single_opening_record() {
        let s = validate(&[rec("1", 0.0, 0.0, 1000.0)]).unwrap();
        assert_eq!(s.expected_balance, 1000.0);
        assert!(s.is_valid);
        assert_eq!(s.difference, 0.0);
        assert_eq!(s.total_transactions, 1);
    }

    #[test]
    fn test_credit_chain_is_valid() {
        let records = [rec("1", 0.0, 0.0, 1000.0), rec("2", 0.0, 500.0, 1500.0)];
        let s = validate(&records).unwrap();
        assert_eq!(s.opening_balance, 1000.0);
        assert_eq!(s.expected_balance, 1500.0);
        assert_eq!(s.actual_balance, 1500.0);
        assert!(s.is_valid);
        assert_eq!(s.severity(), Severity::Info);
    }

    #[test]
    fn test_mismatch_reports_difference() {
        let records = [rec("1", 0.0, 0.0, 1000.0), rec("2", 0.0, 500.0, 1400.0)];
        let s = validate(&records).unwrap();
        assert_eq!(s.expected_balance, 1500.0);
        assert_eq!(s.actual_balance, 1400.0);
        assert_eq!(s.difference, 100.0);
        assert!(!s.is_valid);
        assert_eq!(s.severity(), Severity::Error);
        assert!(s.headline().contains("difference 100.00"));
    }

    #[test]
    fn test_sub_unit_noise_is_tolerated() {
        let records = [rec("1", 10.0, 0.0, 90.0), rec("2", 0.333, 0.0, 89.9)];
        let s = validate(&records).unwrap();
        assert!(s.difference < 1.0);
        assert!(s.is_valid);
    }

    #[test]
    fn test_opening_balance_backs_out_first_amounts() {
        let records = [rec("1", 15420.0, 0.0, 524580.0), rec("2", 0.0, 250000.0, 774580.0)];
        let s = validate(&records).unwrap();
        assert_eq!(s.opening_balance, 540000.0);
        assert_eq!(s.expected_balance, 774580.0);
        assert_eq!(s.difference, 0.0);
        assert!(s.is_valid);

        // the opening row's debit is applied once, not twice
        let alone = validate(&records[..1]).unwrap();
        assert_eq!(alone.expected_balance, 524580.0);
        assert_eq!(alone.difference, 0.0);
    }

    #[test]
    fn test_debit_and_credit_on_same_record() {
        // net +30 on the second line
        let records = [rec("1", 0.0, 0.0, 500.0), rec("2", 20.0, 50.0, 530.0)];
        let s = validate(&records).unwrap();
        assert!(s.is_valid);
        assert_eq!(s.total_debits, 20.0);
        assert_eq!(s.total_credits, 50.0);
    }

    #[test]
    fn test_negative_amounts_are_not_rejected() {
        let records = [rec("1", 0.0, 0.0, 100.0), rec("2", -25.0, 0.0, 125.0)];
        let s = validate(&records).unwrap();
        assert!(s.is_valid);
        assert_eq!(s.total_debits, -25.0);
    }

    #[test]
    fn test_chain_breaks_points_at_bad_row() {
        let records = [
            rec("1", 0.0, 0.0, 1000.0),
            rec("2", 100.0, 0.0, 900.0),
            rec("3", 0.0, 50.0, 970.0),
            rec("4", 20.0, 0.0, 950.0),
        ];
        let breaks = chain_breaks(&records);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].index, 2);
        assert_eq!(breaks[0].id, "3");
        assert_eq!(breaks[0].expected_balance, 950.0);
        assert_eq!(breaks[0].difference(), 20.0);
    }
}
