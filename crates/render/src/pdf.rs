//! PDF rasterization through pdfium.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use pdfium_render::prelude::*;

use crate::{PageRenderer, RenderError, Result};

/// Binds pdfium on every call, trying `library_paths` before the system
/// library.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    pub library_paths: Vec<PathBuf>,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self {
            library_paths: default_search_paths(),
        }
    }
}

fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(dir) = std::env::var("PDFIUM_LIB_DIR") {
        paths.push(PathBuf::from(dir));
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));
    if let Some(exe_dir) = exe_dir {
        paths.push(exe_dir.join("libs"));
        paths.push(exe_dir);
    }
    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));

    paths
}

impl PdfRenderer {
    fn bind(&self) -> Result<Pdfium> {
        for path in &self.library_paths {
            let lib_path = Pdfium::pdfium_platform_library_name_at_path(path);
            log::debug!("[Pdf] trying pdfium at {:?}", lib_path);

            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                log::debug!("[Pdf] loaded pdfium from {:?}", path);
                return Ok(Pdfium::new(bindings));
            }
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| RenderError::Bind(e.to_string()))
    }
}

/// Pixel size of a page `points` wide at `dpi`. The point size is rounded
/// first, then scaled and truncated.
fn target_pixels(points: f32, dpi: u32) -> i32 {
    let rounded = (points + 0.5).floor();
    (rounded / 72.0 * dpi as f32) as i32
}

fn load_error(path: &Path, e: PdfiumError) -> RenderError {
    RenderError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn render(page: &PdfPage<'_>, page_index: usize, dpi: u32) -> Result<DynamicImage> {
    let width = target_pixels(page.width().value, dpi);
    let height = target_pixels(page.height().value, dpi);
    log::debug!(
        "[Pdf] page {}: {}x{} pt -> {}x{} px at {} dpi",
        page_index,
        page.width().value,
        page.height().value,
        width,
        height,
        dpi
    );

    let config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| RenderError::Render {
            page: page_index,
            reason: e.to_string(),
        })?;

    Ok(bitmap.as_image())
}

impl PageRenderer for PdfRenderer {
    fn page_count(&self, path: &Path) -> Result<usize> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| load_error(path, e))?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(&self, path: &Path, page_index: usize, dpi: u32) -> Result<DynamicImage> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| load_error(path, e))?;

        let index = PdfPageIndex::try_from(page_index).map_err(|e| RenderError::Page {
            page: page_index,
            reason: e.to_string(),
        })?;
        let page = document.pages().get(index).map_err(|e| RenderError::Page {
            page: page_index,
            reason: e.to_string(),
        })?;

        render(&page, page_index, dpi)
    }

    /// Binds pdfium and loads the document once for all pages.
    fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage) -> ControlFlow<()>,
    ) -> Result<()> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| load_error(path, e))?;

        for (page_index, page) in document.pages().iter().enumerate() {
            if visit(page_index, render(&page, page_index, dpi)?).is_break() {
                break;
            }
        }
        Ok(())
    }
}
