//! OCR redaction errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] fott_core::CoreError),

    #[error("document has neither readResults nor pages")]
    UnknownSchema,

    #[error("page {page} is out of range, document has {count} pages")]
    PageOutOfRange { page: u32, count: usize },
}

pub type Result<T> = std::result::Result<T, OcrError>;
