//! stmtconv-ingest: document intake, the extraction gateway (Gemini or demo data) and the extraction worker.

pub mod demo;
pub mod document;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod response;
pub mod worker;

pub use demo::{DemoExtractor, demo_records};
pub use document::{MAX_DOCUMENT_BYTES, StatementDocument};
pub use error::{ExtractError, IntakeError};
pub use gateway::{Extractor, Gateway};
pub use gemini::{GeminiConfig, GeminiExtractor};
pub use worker::{ExtractionEvent, ExtractionRequest, run_worker};
