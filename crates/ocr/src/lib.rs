//! OCR result redaction for the v2 (Read) and v3 (Layout) result schemas.
//!
//! Label annotations are matched against OCR words geometrically. Matched
//! words are masked everywhere their text appears: the word itself, its line,
//! table cells and, for v3, the document-wide `content` string.

mod error;
mod text;
pub mod v2;
pub mod v3;

pub use error::{OcrError, Result};
pub use text::{mask_span, mask_token};
pub use v2::OcrResultV2;
pub use v3::OcrResultV3;

use fott_core::{ApiVersion, LabelDocument, OcrSchema, PageSizes};
use fott_rules::FieldSelector;
use serde::Serialize;
use serde_json::Value;

/// A line is searched for words when it overlaps an annotation this much.
pub const LINE_OVERLAP_THRESHOLD: f64 = 0.1;
/// A word is redacted when it lies this much inside an annotation.
pub const WORD_OVERLAP_THRESHOLD: f64 = 0.98;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedactionStats {
    pub words: usize,
    pub lines: usize,
    pub cells: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OcrDocument {
    V2(OcrResultV2),
    V3(OcrResultV3),
}

impl OcrDocument {
    pub fn from_slice(bytes: &[u8], schema: OcrSchema) -> Result<Self> {
        Ok(match schema {
            OcrSchema::V2 => OcrDocument::V2(fott_core::from_json_slice(bytes)?),
            OcrSchema::V3 => OcrDocument::V3(fott_core::from_json_slice(bytes)?),
        })
    }

    /// Parses without a version hint, telling the schemas apart by whether
    /// `analyzeResult` holds `readResults` or `pages`.
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        let value: Value = fott_core::from_json_slice(bytes)?;
        let analyze = value.get("analyzeResult").ok_or(OcrError::UnknownSchema)?;
        let schema = if analyze.get("readResults").is_some() {
            OcrSchema::V2
        } else if analyze.get("pages").is_some() {
            OcrSchema::V3
        } else {
            return Err(OcrError::UnknownSchema);
        };
        log::debug!("[Ocr] detected {:?} schema", schema);
        Ok(match schema {
            OcrSchema::V2 => OcrDocument::V2(serde_json::from_value(value)?),
            OcrSchema::V3 => OcrDocument::V3(serde_json::from_value(value)?),
        })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(match self {
            OcrDocument::V2(doc) => fott_core::to_json_vec(doc)?,
            OcrDocument::V3(doc) => fott_core::to_json_vec(doc)?,
        })
    }

    pub fn schema(&self) -> OcrSchema {
        match self {
            OcrDocument::V2(_) => OcrSchema::V2,
            OcrDocument::V3(_) => OcrSchema::V3,
        }
    }

    pub fn page_sizes(&self) -> PageSizes {
        match self {
            OcrDocument::V2(doc) => doc.page_sizes(),
            OcrDocument::V3(doc) => doc.page_sizes(),
        }
    }

    pub fn page_count(&self) -> usize {
        match self {
            OcrDocument::V2(doc) => doc.page_count(),
            OcrDocument::V3(doc) => doc.page_count(),
        }
    }

    /// Masks every word covered by a selected label annotation.
    pub fn redact(
        &mut self,
        label: &LabelDocument,
        fields: &FieldSelector,
    ) -> Result<RedactionStats> {
        let annotations = label.to_annotations(&self.page_sizes())?;
        Ok(match self {
            OcrDocument::V2(doc) => doc.redact(&annotations, fields),
            OcrDocument::V3(doc) => doc.redact(&annotations, fields),
        })
    }

    pub fn extract_page(&self, page: u32) -> Result<Self> {
        Ok(match self {
            OcrDocument::V2(doc) => OcrDocument::V2(doc.extract_page(page)?),
            OcrDocument::V3(doc) => OcrDocument::V3(doc.extract_page(page)?),
        })
    }
}

/// Parses an OCR file of the given API version, redacts it against `label`
/// and re-serializes it.
pub fn redact_ocr(
    bytes: &[u8],
    label: &LabelDocument,
    version: ApiVersion,
    fields: &FieldSelector,
) -> Result<Vec<u8>> {
    let mut document = OcrDocument::from_slice(bytes, version.schema())?;
    let stats = document.redact(label, fields)?;
    log::info!(
        "[Ocr] {} redaction: {} words, {} lines, {} cells",
        version,
        stats.words,
        stats.lines,
        stats.cells
    );
    document.to_vec()
}
