use thiserror::Error;

/// Reasons a document is refused before any processing starts
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Please upload a PDF file only")]
    NotPdf,

    #[error("File size must be less than {limit_mib} MiB (got {size} bytes)")]
    TooLarge { size: u64, limit_mib: u64 },

    #[error("File is empty")]
    Empty,

    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the extraction service
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Gemini API key not configured (set {0})")]
    MissingCredential(String),

    #[error("extraction service unavailable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("extraction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no JSON object found in the model response")]
    NoJson,

    #[error("could not parse the model response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("model response has no transactions array")]
    MissingTransactions,
}
