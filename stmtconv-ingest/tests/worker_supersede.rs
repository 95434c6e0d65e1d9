use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stmtconv_core::{ExtractionOutcome, LedgerSource, Session, TransactionRecord};
use stmtconv_ingest::{
    DemoExtractor, ExtractError, ExtractionEvent, ExtractionRequest, Extractor, Gateway,
    StatementDocument, run_worker,
};
use tokio::sync::mpsc;

/// Slow for documents named `slow*.pdf`, instant otherwise; one record named after the document.
struct ByName;

impl Extractor for ByName {
    fn extract(
        &self,
        document: &StatementDocument,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ExtractError>> + Send {
        let name = document.name().to_string();
        async move {
            if name.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(vec![TransactionRecord::new(name.clone(), "2024-06-01", name, 0.0, 0.0, 100.0)])
        }
    }
}

fn doc(name: &str) -> StatementDocument {
    StatementDocument::from_bytes(name, b"%PDF-1.5\n%%EOF\n".to_vec()).unwrap()
}

fn finished(events: &[ExtractionEvent]) -> Vec<(u64, ExtractionOutcome)> {
    events
        .iter()
        .filter_map(|e| match e {
            ExtractionEvent::Finished { request_id, outcome } => Some((*request_id, outcome.clone())),
            ExtractionEvent::Started { .. } => None,
        })
        .collect()
}

/// A second upload aborts the slow first one; only the second result is reported.
#[tokio::test]
async fn test_new_request_supersedes_pending_one() {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();

    req_tx
        .send(ExtractionRequest { request_id: 1, document: doc("slow.pdf") })
        .unwrap();
    req_tx
        .send(ExtractionRequest { request_id: 2, document: doc("fast.pdf") })
        .unwrap();
    drop(req_tx);

    let gateway = Arc::new(Gateway::new(ByName));
    tokio::time::timeout(Duration::from_secs(10), run_worker(gateway, req_rx, ev_tx))
        .await
        .expect("worker should finish once the fast request completes");

    let events: Vec<ExtractionEvent> = ev_rx.try_iter().collect();
    let done = finished(&events);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].0, 2);
    assert_eq!(done[0].1.records[0].id, "fast.pdf");
    assert_eq!(done[0].1.source, LedgerSource::Extracted);
}

/// Session only accepts the result for the request it is waiting on.
#[tokio::test]
async fn test_session_applies_worker_results() {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();

    let mut session = Session::new();
    let id = session.begin("fast.pdf");
    req_tx
        .send(ExtractionRequest { request_id: id, document: doc("fast.pdf") })
        .unwrap();
    drop(req_tx);

    run_worker(Arc::new(Gateway::new(ByName)), req_rx, ev_tx).await;

    for ev in ev_rx.try_iter() {
        if let ExtractionEvent::Finished { request_id, outcome } = ev {
            assert!(session.finish(request_id, outcome));
        }
    }
    assert!(!session.is_processing());
    assert_eq!(session.ledger().len(), 1);
    assert!(session.validation().unwrap().is_valid);
}

/// Without a credential the worker still answers, with demo data and a warning.
#[tokio::test]
async fn test_demo_only_gateway_reports_fallback() {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();

    req_tx
        .send(ExtractionRequest { request_id: 7, document: doc("march.pdf") })
        .unwrap();
    drop(req_tx);

    let gateway: Gateway<ByName> = Gateway::demo_only("Gemini API key not configured (set GEMINI_API_KEY)")
        .with_fallback(DemoExtractor::new().with_delay(Duration::from_millis(5)));
    run_worker(Arc::new(gateway), req_rx, ev_tx).await;

    let events: Vec<ExtractionEvent> = ev_rx.try_iter().collect();
    assert!(matches!(events[0], ExtractionEvent::Started { request_id: 7 }));
    let done = finished(&events);
    assert_eq!(done.len(), 1);
    assert!(done[0].1.is_fallback());
    assert!(done[0].1.warning().unwrap().contains("GEMINI_API_KEY"));
    assert_eq!(done[0].1.records.len(), 5);
}
