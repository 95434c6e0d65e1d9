use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("no record with id {0}")]
    RecordNotFound(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid amount for {field}: {value:?}")]
    InvalidAmount { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no columns selected for export")]
    NoColumns,

    #[error("unknown export column: {0}")]
    UnknownColumn(String),

    #[error("unknown date format: {0}")]
    UnknownDateFormat(String),

    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("flushing csv output: {0}")]
    Flush(String),

    #[error("csv output was not valid utf-8")]
    Encoding,
}
