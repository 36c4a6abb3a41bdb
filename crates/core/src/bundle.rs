//! Grouping of image, label and OCR files into bundles, and the file naming
//! conventions shared by the pipeline.

use serde::{Deserialize, Serialize};

pub const LABEL_SUFFIX: &str = ".labels.json";
pub const OCR_SUFFIX: &str = ".ocr.json";
pub const RENDERED_SUFFIX: &str = ".rendered.png";
pub const REDACTED_PREFIX: &str = "redacted_";

/// Which base files a listing should be scanned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Any raster image, single or multi-frame.
    ImageOnly,
    PdfOnly,
    /// Documents that need page decomposition.
    MultiPage,
    /// Raster formats that always hold exactly one page.
    SinglePage,
}

impl FileType {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileType::ImageOnly => &[".jpeg", ".jpg", ".tif", ".tiff", ".png", ".bmp"],
            FileType::PdfOnly => &[".pdf"],
            FileType::MultiPage => &[".pdf", ".tif", ".tiff"],
            FileType::SinglePage => &[".jpeg", ".jpg", ".png", ".bmp"],
        }
    }

    /// Case-sensitive suffix match; the suffix alone is not a file name.
    pub fn matches(&self, name: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext))
    }
}

/// The three artifacts of one document or one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileBundle {
    pub image_name: String,
    pub label_name: String,
    pub ocr_name: String,
}

impl FileBundle {
    pub fn for_image(image_name: &str) -> Self {
        Self {
            image_name: image_name.to_string(),
            label_name: format!("{image_name}{LABEL_SUFFIX}"),
            ocr_name: format!("{image_name}{OCR_SUFFIX}"),
        }
    }

    /// Bundles every base file of class `kind` whose label and OCR companions
    /// are both listed. Incomplete sets are skipped without error.
    pub fn from_names<S: AsRef<str>>(names: &[S], kind: FileType) -> Vec<FileBundle> {
        let listed: std::collections::HashSet<&str> = names.iter().map(AsRef::as_ref).collect();

        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| kind.matches(name))
            .map(FileBundle::for_image)
            .filter(|bundle| {
                let complete = listed.contains(bundle.label_name.as_str())
                    && listed.contains(bundle.ocr_name.as_str());
                if !complete {
                    log::debug!(
                        "[Bundle] skipping {}: label or OCR file missing",
                        bundle.image_name
                    );
                }
                complete
            })
            .collect()
    }

    /// Names of the redacted outputs for this bundle.
    pub fn redacted(&self) -> FileBundle {
        FileBundle {
            image_name: redacted_file_name(&self.image_name),
            label_name: redacted_file_name(&self.label_name),
            ocr_name: redacted_file_name(&self.ocr_name),
        }
    }

    /// Names of the single-page bundle rendered from page `page` of this one.
    pub fn page(&self, page: u32) -> FileBundle {
        FileBundle::for_image(&page_file_name(&self.image_name, page, Some(RENDERED_SUFFIX)))
    }
}

/// `a.jpg.labels.json` becomes `redacted_a.jpg.labels.json`.
pub fn redacted_file_name(name: &str) -> String {
    format!("{REDACTED_PREFIX}{name}")
}

/// `a.pdf` page 3 becomes `a.pdf.003`, followed by `suffix` if given.
pub fn page_file_name(name: &str, page: u32, suffix: Option<&str>) -> String {
    format!("{name}.{page:03}{}", suffix.unwrap_or(""))
}

pub fn is_pdf(name: &str) -> bool {
    FileType::PdfOnly.matches(name)
}

pub fn is_tiff(name: &str) -> bool {
    [".tif", ".tiff"]
        .iter()
        .any(|ext| name.len() > ext.len() && name.ends_with(ext))
}
