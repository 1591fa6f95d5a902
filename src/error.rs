use thiserror::Error;

/// Errors produced while loading, cleaning, exporting or storing data
#[derive(Debug, Error)]
pub enum SweeperError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel read error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Excel write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Request too large: {0}")]
    PayloadTooLarge(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Image error: {0}")]
    Image(String),
}

impl SweeperError {
    /// True for errors caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SweeperError::Csv(_)
                | SweeperError::Excel(_)
                | SweeperError::UnsupportedFile(_)
                | SweeperError::EmptyFile(_)
                | SweeperError::InvalidTable(_)
                | SweeperError::UnknownColumn(_)
                | SweeperError::Validation(_)
                | SweeperError::PayloadTooLarge(_)
                | SweeperError::Image(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SweeperError>;
