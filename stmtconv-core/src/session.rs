//! State container owned by whichever loop drives the review.
//!
//! Holds the current ledger, the processing flag and the user-facing notice.
//! Extraction results are matched against the request id the session is
//! waiting for; anything else (a reset or a newer upload happened meanwhile)
//! is dropped.

use serde::Serialize;

use crate::error::{ExportError, LedgerError};
use crate::export::{self, ExportSettings};
use crate::ledger::{EditField, Ledger, LedgerStore, NumericPolicy};
use crate::record::TransactionRecord;
use crate::validator::BalanceSummary;

/// Where the current records came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerSource {
    Extracted,
    Demo,
}

/// What the extraction gateway hands back to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub records: Vec<TransactionRecord>,
    pub source: LedgerSource,
    warning: Option<String>,
}

impl ExtractionOutcome {
    pub fn extracted(records: Vec<TransactionRecord>) -> Self {
        Self {
            records,
            source: LedgerSource::Extracted,
            warning: None,
        }
    }

    /// Demo data stood in for a failed or unavailable extraction; the reason
    /// is always surfaced to the user.
    pub fn fallback(records: Vec<TransactionRecord>, reason: impl Into<String>) -> Self {
        Self {
            records,
            source: LedgerSource::Demo,
            warning: Some(reason.into()),
        }
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn is_fallback(&self) -> bool {
        self.source == LedgerSource::Demo
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing { request_id: u64 },
    Ready,
}

#[derive(Debug)]
pub struct Session {
    phase: Phase,
    document: Option<String>,
    store: LedgerStore,
    source: Option<LedgerSource>,
    notice: Option<String>,
    policy: NumericPolicy,
    next_request_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            document: None,
            store: LedgerStore::new(),
            source: None,
            notice: None,
            policy: NumericPolicy::default(),
            next_request_id: 1,
        }
    }

    pub fn with_policy(mut self, policy: NumericPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start processing a newly accepted document. Clears any previous ledger
    /// and returns the id the eventual result must carry.
    pub fn begin(&mut self, document_name: impl Into<String>) -> u64 {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        self.document = Some(document_name.into());
        self.store.reset();
        self.source = None;
        self.notice = None;
        self.phase = Phase::Processing { request_id };
        request_id
    }

    /// Apply an extraction result. Returns `false` if the result was stale.
    pub fn finish(&mut self, request_id: u64, outcome: ExtractionOutcome) -> bool {
        if self.phase != (Phase::Processing { request_id }) {
            log::debug!("discarding stale extraction result {request_id}");
            return false;
        }
        if let Some(w) = outcome.warning() {
            log::warn!("using demo data: {w}");
        }
        self.notice = outcome.warning.clone();
        self.source = Some(outcome.source);
        self.store.load(outcome.records);
        self.phase = Phase::Ready;
        true
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.document = None;
        self.store.reset();
        self.source = None;
        self.notice = None;
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.phase, Phase::Processing { .. })
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn source(&self) -> Option<LedgerSource> {
        self.source
    }

    /// Warning to display alongside the ledger (set when demo data is shown)
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn ledger(&self) -> &Ledger {
        self.store.current()
    }

    pub fn edit(&mut self, id: &str, field: EditField, value: &str) -> Result<(), LedgerError> {
        self.store.apply(id, field, value, self.policy)
    }

    pub fn set_validity(&mut self, id: &str, is_valid: bool) -> Result<(), LedgerError> {
        self.store.set_validity(id, is_valid)
    }

    pub fn validation(&self) -> Option<BalanceSummary> {
        self.store.current().summary()
    }

    pub fn export(&self, settings: &ExportSettings) -> Result<String, ExportError> {
        export::to_csv(self.store.current().records(), settings)
    }
}
