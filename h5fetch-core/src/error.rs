use h5fetch_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid URL, expected http:// or https://: {0}")]
    InvalidRoot(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ledger encoding error: {0}")]
    LedgerError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
