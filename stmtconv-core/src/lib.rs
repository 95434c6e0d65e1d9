//! stmtconv-core: transaction records, balance validation, the editable ledger and CSV export

pub mod error;
pub mod export;
pub mod ledger;
pub mod record;
pub mod session;
pub mod validator;

pub use error::{ExportError, LedgerError};
pub use export::{Column, DateFormat, ExportSettings, export_file_name, to_csv};
pub use ledger::{EditField, Ledger, LedgerStore, NumericPolicy};
pub use record::TransactionRecord;
pub use session::{ExtractionOutcome, LedgerSource, Phase, Session};
pub use validator::{BALANCE_TOLERANCE, BalanceSummary, ChainBreak, Severity, chain_breaks, validate};
