//! Extraction gateway: the consumed interface plus the fallback policy.

use std::future::Future;

use stmtconv_core::{ExtractionOutcome, TransactionRecord};

use crate::demo::DemoExtractor;
use crate::document::StatementDocument;
use crate::error::ExtractError;

/// Turns a document into ordered transaction records, or fails with a reason.
pub trait Extractor {
    fn extract(
        &self,
        document: &StatementDocument,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ExtractError>> + Send;
}

/// Primary extractor with a demo fallback.
///
/// No retries: one attempt at the primary, then the demo dataset with the
/// failure reason attached as a warning.
#[derive(Debug, Clone)]
pub struct Gateway<E> {
    primary: Result<E, String>,
    fallback: DemoExtractor,
}

impl<E: Extractor> Gateway<E> {
    pub fn new(primary: E) -> Self {
        Self {
            primary: Ok(primary),
            fallback: DemoExtractor::new(),
        }
    }

    /// No usable primary (e.g. no credential): always serve demo data, with
    /// `reason` as the warning.
    pub fn demo_only(reason: impl Into<String>) -> Self {
        Self {
            primary: Err(reason.into()),
            fallback: DemoExtractor::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: DemoExtractor) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_ok()
    }

    pub async fn run(&self, document: &StatementDocument) -> ExtractionOutcome {
        let reason = match &self.primary {
            Ok(primary) => match primary.extract(document).await {
                Ok(records) => {
                    log::info!("extracted {} transactions from {}", records.len(), document.name());
                    return ExtractionOutcome::extracted(records);
                }
                Err(e) => {
                    log::warn!("extraction of {} failed: {e}", document.name());
                    e.to_string()
                }
            },
            Err(reason) => reason.clone(),
        };

        match self.fallback.extract(document).await {
            Ok(records) => ExtractionOutcome::fallback(records, reason),
            // the demo extractor cannot fail; keep the warning and show nothing
            Err(e) => ExtractionOutcome::fallback(Vec::new(), format!("{reason}; {e}")),
        }
    }
}

impl Gateway<crate::gemini::GeminiExtractor> {
    /// Build from configuration, routing through demo data when the
    /// credential is absent.
    pub fn from_config(config: crate::gemini::GeminiConfig) -> Self {
        match crate::gemini::GeminiExtractor::from_env(config) {
            Ok(extractor) => Gateway::new(extractor),
            Err(e) => {
                log::info!("{e}; using demo data");
                Gateway::demo_only(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stmtconv_core::LedgerSource;

    struct Fixed(Vec<TransactionRecord>);

    impl Extractor for Fixed {
        fn extract(
            &self,
            _document: &StatementDocument,
        ) -> impl Future<Output = Result<Vec<TransactionRecord>, ExtractError>> + Send {
            let records = self.0.clone();
            async move { Ok(records) }
        }
    }

    struct Failing;

    impl Extractor for Failing {
        fn extract(
            &self,
            _document: &StatementDocument,
        ) -> impl Future<Output = Result<Vec<TransactionRecord>, ExtractError>> + Send {
            async { Err(ExtractError::NoJson) }
        }
    }

    fn doc() -> StatementDocument {
        StatementDocument::from_bytes("s.pdf", b"%PDF-1.4\n".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_is_not_flagged() {
        let rec = TransactionRecord::new("x", "2024-05-01", "Coffee", 4.5, 0.0, 95.5);
        let out = Gateway::new(Fixed(vec![rec.clone()])).run(&doc()).await;
        assert_eq!(out.source, LedgerSource::Extracted);
        assert_eq!(out.records, vec![rec]);
        assert!(out.warning().is_none());
    }

    #[tokio::test]
    async fn test_empty_extraction_is_still_a_success() {
        let out = Gateway::new(Fixed(vec![])).run(&doc()).await;
        assert!(!out.is_fallback());
        assert!(out.records.is_empty());
    }

    #[tokio::test]
    async fn test_failure_falls_back_with_warning() {
        let out = Gateway::new(Failing).run(&doc()).await;
        assert_eq!(out.source, LedgerSource::Demo);
        assert_eq!(out.records, crate::demo::demo_records());
        assert_eq!(out.warning(), Some("no JSON object found in the model response"));
    }

    #[tokio::test]
    async fn test_demo_only_uses_reason() {
        let g: Gateway<Failing> = Gateway::demo_only("Gemini API key not configured");
        assert!(!g.has_primary());
        let out = g.run(&doc()).await;
        assert!(out.is_fallback());
        assert_eq!(out.warning(), Some("Gemini API key not configured"));
        assert_eq!(out.records.len(), 5);
    }
}
