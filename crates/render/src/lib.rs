//! Rasterizing multi-page documents into one image per page.

mod multiframe;
mod pdf;

pub use multiframe::TiffRenderer;
pub use pdf::PdfRenderer;

use std::ops::ControlFlow;
use std::path::Path;

use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("pdfium library unavailable: {0}")]
    Bind(String),

    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("page {page} unavailable: {reason}")]
    Page { page: usize, reason: String },

    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("tiff error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no renderer for {0}")]
    UnsupportedFormat(String),

    #[error("unsupported tiff color type: {0}")]
    UnsupportedColor(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Renders pages of a document file. Page indexes are 0-based.
///
/// Implementations open the document on every call and release it before
/// returning.
pub trait PageRenderer: Send + Sync {
    fn page_count(&self, path: &Path) -> Result<usize>;

    fn render_page(&self, path: &Path, page_index: usize, dpi: u32) -> Result<DynamicImage>;

    /// Renders every page in order, handing each one to `visit` before the
    /// next is rendered. Stops early when `visit` breaks.
    fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage) -> ControlFlow<()>,
    ) -> Result<()> {
        for index in 0..self.page_count(path)? {
            if visit(index, self.render_page(path, index, dpi)?).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Every page in order.
    fn render_document(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
        let mut pages = Vec::new();
        self.render_pages(path, dpi, &mut |_, image| {
            pages.push(image);
            ControlFlow::Continue(())
        })?;
        Ok(pages)
    }
}

/// Picks a renderer from the file extension.
pub fn renderer_for(path: &Path) -> Result<Box<dyn PageRenderer>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "pdf" => Ok(Box::new(PdfRenderer::default())),
        "tif" | "tiff" => Ok(Box::new(TiffRenderer)),
        _ => Err(RenderError::UnsupportedFormat(path.display().to_string())),
    }
}
