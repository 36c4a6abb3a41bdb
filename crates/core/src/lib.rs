//! Shared model for redacting form-labeling artifacts.
//!
//! A document is described by three artifacts: the page image, a label file
//! (`*.labels.json`) naming fields and their normalized locations, and an OCR
//! result (`*.ocr.json`). This crate holds the types every redactor agrees on:
//! polygons and their overlap test, text spans, the label model with its
//! pixel-space expansion, file bundles, and the OCR API versions.

pub mod bundle;
pub mod geometry;
pub mod label;
pub mod span;
pub mod version;

pub use bundle::{FileBundle, FileType};
pub use geometry::{overlap_ratio, similar, BoundingBox, OVERLAP_THRESHOLD};
pub use label::{to_pixels, Annotation, Entity, Label, LabelDocument, PageSizes};
pub use span::Span;
pub use version::{ApiVersion, OcrSchema};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no page size known for page {0}")]
    UnknownPage(u32),
    #[error("coordinate is not a finite number: {0}")]
    NonFiniteCoordinate(f64),
    #[error("unsupported api version: {0}")]
    UnsupportedApiVersion(String),
    #[error("span {offset}+{length} is not inside the container spans")]
    SpanOutside { offset: usize, length: usize },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses a JSON artifact, tolerating a leading UTF-8 byte order mark.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    Ok(serde_json::from_slice(bytes)?)
}

pub fn to_json_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
