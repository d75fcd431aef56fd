use thiserror::Error;
use voxlead_store::StoreError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unsupported source type: {0}")]
    UnsupportedSource(String),

    #[error("document contains no text")]
    EmptyDocument,

    #[error("failed to read pdf: {0}")]
    Pdf(String),

    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("invalid json export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid file payload: {0}")]
    Decode(String),

    #[error("invalid chunking: size {size}, overlap {overlap}")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index error: {0}")]
    Index(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("blocking task failed: {0}")]
    Join(String),
}
