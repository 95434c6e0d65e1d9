//! Fixed dataset shown when live extraction is unavailable or fails.

use std::future::Future;
use std::time::Duration;

use stmtconv_core::TransactionRecord;

use crate::document::StatementDocument;
use crate::error::ExtractError;
use crate::gateway::Extractor;

/// Five internally consistent rows (each balance follows from the previous one).
pub fn demo_records() -> Vec<TransactionRecord> {
    vec![
        TransactionRecord::new("1", "2024-01-15", "AMAZON.CO.JP purchase", 15420.0, 0.0, 524580.0)
            .with_category("Shopping"),
        TransactionRecord::new("2", "2024-01-16", "Salary deposit", 0.0, 250000.0, 774580.0)
            .with_category("Salary"),
        TransactionRecord::new("3", "2024-01-17", "Convenience store", 890.0, 0.0, 773690.0)
            .with_category("Food"),
        TransactionRecord::new("4", "2024-01-18", "Electricity bill", 8500.0, 0.0, 765190.0)
            .with_category("Utilities"),
        TransactionRecord::new("5", "2024-01-19", "ATM withdrawal", 20000.0, 0.0, 745190.0)
            .with_category("Cash"),
    ]
}

/// Extractor that ignores the document and returns [`demo_records`].
#[derive(Debug, Clone, Default)]
pub struct DemoExtractor {
    delay: Duration,
}

impl DemoExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate processing time before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Extractor for DemoExtractor {
    fn extract(
        &self,
        _document: &StatementDocument,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ExtractError>> + Send {
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(demo_records())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_dataset_is_balance_consistent() {
        let records = demo_records();
        let summary = stmtconv_core::validate(&records).unwrap();
        assert!(summary.is_valid);
        assert_eq!(summary.total_transactions, 5);
        assert_eq!(summary.total_debits, 44810.0);
        assert_eq!(summary.total_credits, 250000.0);
        assert!(stmtconv_core::chain_breaks(&records).is_empty());
    }
}
