//! Label file model (`*.labels.json`) and its expansion into pixel-space
//! annotations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::BoundingBox;
use crate::{CoreError, Result};

/// Page number (1-based) to `(width, height)` in target units.
pub type PageSizes = BTreeMap<u32, (f64, f64)>;

/// Top-level label document. Keys other than `labels` are carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDocument {
    pub labels: Vec<Label>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One named field and every place it was labeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "label")]
    pub field: String,
    #[serde(rename = "value")]
    pub entities: Vec<Entity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A labeled occurrence on one page, with boxes in page-fraction units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub page: u32,
    pub text: String,
    #[serde(rename = "boundingBoxes")]
    pub bounding_boxes: Vec<BoundingBox>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A labeled region in pixel space, the matching key for image and OCR
/// redaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub bounding_box: BoundingBox,
    pub field: String,
    pub text: String,
    pub page: u32,
}

/// Converts a normalized box on `page` into the units of `page_sizes`.
pub fn to_pixels(
    bounding_box: &BoundingBox,
    page: u32,
    page_sizes: &PageSizes,
) -> Result<BoundingBox> {
    let (width, height) = page_sizes
        .get(&page)
        .copied()
        .ok_or(CoreError::UnknownPage(page))?;
    bounding_box.scaled(width, height)
}

impl LabelDocument {
    /// Expands every entity box of every label into an annotation.
    pub fn to_annotations(&self, page_sizes: &PageSizes) -> Result<Vec<Annotation>> {
        let mut annotations = Vec::new();
        for label in &self.labels {
            for entity in &label.entities {
                for bounding_box in &entity.bounding_boxes {
                    annotations.push(Annotation {
                        bounding_box: to_pixels(bounding_box, entity.page, page_sizes)?,
                        field: label.field.clone(),
                        text: entity.text.clone(),
                        page: entity.page,
                    });
                }
            }
        }
        Ok(annotations)
    }

    /// Keeps only the entities on `page`, renumbered to page 1. Labels left
    /// without entities are dropped.
    pub fn extract_page(&self, page: u32) -> LabelDocument {
        let labels = self
            .labels
            .iter()
            .filter_map(|label| {
                let entities: Vec<Entity> = label
                    .entities
                    .iter()
                    .filter(|entity| entity.page == page)
                    .map(|entity| Entity {
                        page: 1,
                        ..entity.clone()
                    })
                    .collect();
                if entities.is_empty() {
                    None
                } else {
                    Some(Label {
                        field: label.field.clone(),
                        entities,
                        extra: label.extra.clone(),
                    })
                }
            })
            .collect();

        LabelDocument {
            labels,
            extra: self.extra.clone(),
        }
    }

    /// Highest page number referenced by any entity.
    pub fn max_page(&self) -> Option<u32> {
        self.labels
            .iter()
            .flat_map(|label| label.entities.iter().map(|entity| entity.page))
            .max()
    }
}
