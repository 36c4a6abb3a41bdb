//! Splitting multi-page documents into single-page bundles.

use std::ops::ControlFlow;

use fott_core::{FileBundle, LabelDocument};
use fott_image::encode_image;
use fott_ocr::OcrDocument;
use fott_render::PageRenderer;
use image::DynamicImage;

use crate::error::{RedactError, Result};
use crate::storage::{LocalStorage, Storage};

/// Renders every page of `bundle` and writes a page image, a page label file
/// and a page OCR file per page into `target`. Returns the page bundles in
/// page order.
///
/// Pages are numbered from 1 and each page's label entities and OCR record
/// are renumbered to page 1. The document is opened once and each page is
/// written before the next is rendered.
pub fn decompose(
    bundle: &FileBundle,
    source: &LocalStorage,
    target: &dyn Storage,
    renderer: &dyn PageRenderer,
    dpi: u32,
) -> Result<Vec<FileBundle>> {
    let label: LabelDocument = fott_core::from_json_slice(&source.read(&bundle.label_name)?)?;
    let ocr = OcrDocument::detect(&source.read(&bundle.ocr_name)?)?;
    log::info!(
        "[Decompose] {}: {:?} OCR with {} pages",
        bundle.image_name,
        ocr.schema(),
        ocr.page_count()
    );

    let mut pages = Vec::new();
    let mut failure: Option<RedactError> = None;
    let path = source.path(&bundle.image_name);
    renderer.render_pages(&path, dpi, &mut |index, image| {
        match write_page(bundle, &label, &ocr, target, index as u32 + 1, &image) {
            Ok(page) => {
                pages.push(page);
                ControlFlow::Continue(())
            }
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        }
    })?;
    if let Some(e) = failure {
        return Err(e);
    }

    log::info!("[Decompose] {}: {} pages", bundle.image_name, pages.len());
    Ok(pages)
}

fn write_page(
    bundle: &FileBundle,
    label: &LabelDocument,
    ocr: &OcrDocument,
    target: &dyn Storage,
    page: u32,
    image: &DynamicImage,
) -> Result<FileBundle> {
    let page_bundle = bundle.page(page);
    let page_ocr = ocr.extract_page(page)?;
    log::debug!(
        "[Decompose] {} rendered {}x{}",
        page_bundle.image_name,
        image.width(),
        image.height()
    );

    let encoded = encode_image(image, &page_bundle.image_name)?;
    target.write(&page_bundle.image_name, &encoded)?;
    let page_label = label.extract_page(page);
    target.write(&page_bundle.label_name, &fott_core::to_json_vec(&page_label)?)?;
    target.write(&page_bundle.ocr_name, &page_ocr.to_vec()?)?;
    Ok(page_bundle)
}
