use std::sync::Arc;

use stmtconv_core::ExtractionOutcome;
use tokio::sync::mpsc;

use crate::document::StatementDocument;
use crate::gateway::{Extractor, Gateway};

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub request_id: u64,
    pub document: StatementDocument,
}

#[derive(Debug, Clone)]
pub enum ExtractionEvent {
    Started { request_id: u64 },
    Finished { request_id: u64, outcome: ExtractionOutcome },
}

/// Serve extraction requests one at a time. A new request aborts the one in
/// flight; its result is never reported.
pub async fn run_worker<E>(
    gateway: Arc<Gateway<E>>,
    mut rx: mpsc::UnboundedReceiver<ExtractionRequest>,
    tx: std::sync::mpsc::Sender<ExtractionEvent>,
) where
    E: Extractor + Send + Sync + 'static,
{
    let mut current: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(req) = rx.recv().await {
        // cancel in-flight
        if let Some(h) = current.take() {
            if !h.is_finished() {
                log::debug!("superseding extraction before request {}", req.request_id);
            }
            h.abort();
        }

        let tx2 = tx.clone();
        let gateway = Arc::clone(&gateway);
        current = Some(tokio::spawn(async move {
            let _ = tx2.send(ExtractionEvent::Started {
                request_id: req.request_id,
            });

            let outcome = gateway.run(&req.document).await;

            let _ = tx2.send(ExtractionEvent::Finished {
                request_id: req.request_id,
                outcome,
            });
        }));
    }

    // channel closed: let the last request finish so its result is delivered
    if let Some(h) = current.take() {
        let _ = h.await;
    }
}
