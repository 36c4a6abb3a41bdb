//! Redaction of labeled form documents.
//!
//! A document is a bundle of a page image (or a multi-page PDF/TIFF), its
//! label file and its OCR result. This crate reads bundles from a directory,
//! splits multi-page documents into pages and writes redacted copies of every
//! artifact.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod storage;

pub use config::{load_config, save_config, ConfigError, RedactConfig};
pub use error::{RedactError, Result};
pub use pipeline::{redact_bundle, redact_label_and_ocr, run_batch, BatchReport, RedactOptions};
pub use preprocess::decompose;
pub use storage::{list_bundles, LocalStorage, Storage};

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs::File;
    use std::path::Path;

    use fott_render::{PageRenderer, RenderError};
    use image::{DynamicImage, Rgb, RgbImage};
    use serde_json::json;

    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 0])));
        fott_image::encode_image(&image, "fixture.png").unwrap()
    }

    /// A gray TIFF with `frames` 100x100 frames.
    pub fn write_tiff(path: &Path, frames: u32) {
        use tiff::encoder::{colortype, TiffEncoder};

        let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        for _ in 0..frames {
            encoder.write_image::<colortype::Gray8>(100, 100, &[0u8; 100 * 100]).unwrap();
        }
    }

    /// One "Name" entity per page, text `John<page>`, at 10..50 x 10..30
    /// percent of the page.
    pub fn label_json(pages: u32) -> Vec<u8> {
        let entities: Vec<_> = (1..=pages)
            .map(|p| {
                json!({
                    "page": p,
                    "text": format!("John{p}"),
                    "boundingBoxes": [[0.1, 0.1, 0.5, 0.1, 0.5, 0.3, 0.1, 0.3]]
                })
            })
            .collect();
        serde_json::to_vec(&json!({
            "document": "fixture",
            "labels": [{"label": "Name", "value": entities}]
        }))
        .unwrap()
    }

    /// A v3 result with pages 100x100 pixels, each holding the single word
    /// `John<page>` where the label expects it.
    pub fn ocr_v3_json(pages: u32) -> Vec<u8> {
        let words: Vec<String> = (1..=pages).map(|p| format!("John{p}")).collect();
        let page_values: Vec<_> = (1..=pages)
            .map(|p| {
                let span = json!({"offset": 6 * (p - 1), "length": 5});
                json!({
                    "pageNumber": p,
                    "width": 100,
                    "height": 100,
                    "unit": "pixel",
                    "spans": [span],
                    "words": [{
                        "content": format!("John{p}"),
                        "boundingBox": [10, 10, 50, 10, 50, 30, 10, 30],
                        "span": span,
                        "confidence": 0.99
                    }],
                    "lines": [{"content": format!("John{p}"), "spans": [span]}]
                })
            })
            .collect();
        serde_json::to_vec(&json!({
            "status": "succeeded",
            "analyzeResult": {
                "apiVersion": "2022-08-31",
                "content": words.join("\n"),
                "pages": page_values
            }
        }))
        .unwrap()
    }

    /// Renders `pages` black 100x100 pages for any path.
    pub struct BlankRenderer {
        pub pages: usize,
    }

    impl PageRenderer for BlankRenderer {
        fn page_count(&self, _path: &Path) -> fott_render::Result<usize> {
            Ok(self.pages)
        }

        fn render_page(
            &self,
            _path: &Path,
            page_index: usize,
            _dpi: u32,
        ) -> fott_render::Result<DynamicImage> {
            if page_index >= self.pages {
                return Err(RenderError::Page {
                    page: page_index,
                    reason: "no such page".to_string(),
                });
            }
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))))
        }
    }
}
