//! Bundle redaction and the batch run over a directory.

use std::fs;
use std::path::{Path, PathBuf};

use fott_core::{ApiVersion, FileBundle, FileType, LabelDocument};
use fott_rules::FieldSelector;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::RedactConfig;
use crate::error::{RedactError, Result};
use crate::preprocess::decompose;
use crate::storage::{list_bundles, LocalStorage, Storage};

#[derive(Debug, Clone)]
pub struct RedactOptions {
    pub fields: FieldSelector,
    pub api_version: ApiVersion,
}

impl From<&RedactConfig> for RedactOptions {
    fn from(config: &RedactConfig) -> Self {
        Self {
            fields: config.fields_to_redact.clone(),
            api_version: config.api_version,
        }
    }
}

/// Redacts the label and OCR files of `bundle` into `target` under their
/// redacted names.
pub fn redact_label_and_ocr(
    bundle: &FileBundle,
    source: &dyn Storage,
    target: &dyn Storage,
    options: &RedactOptions,
) -> Result<LabelDocument> {
    let redacted = bundle.redacted();
    let label: LabelDocument = fott_core::from_json_slice(&source.read(&bundle.label_name)?)?;

    let ocr = fott_ocr::redact_ocr(
        &source.read(&bundle.ocr_name)?,
        &label,
        options.api_version,
        &options.fields,
    )?;
    target.write(&redacted.ocr_name, &ocr)?;

    let mut redacted_label = label.clone();
    fott_label::redact_label(&mut redacted_label, &options.fields);
    target.write(&redacted.label_name, &fott_core::to_json_vec(&redacted_label)?)?;

    Ok(label)
}

/// Redacts the image, label and OCR file of a single-page bundle.
pub fn redact_bundle(
    bundle: &FileBundle,
    source: &dyn Storage,
    target: &dyn Storage,
    options: &RedactOptions,
) -> Result<()> {
    let label = redact_label_and_ocr(bundle, source, target, options)?;

    let redacted = bundle.redacted();
    let image = fott_image::redact_image_bytes(
        &source.read(&bundle.image_name)?,
        &label,
        &redacted.image_name,
        &options.fields,
    )?;
    target.write(&redacted.image_name, &image)?;

    log::info!("[Pipeline] redacted {}", bundle.image_name);
    Ok(())
}

/// A `build-<uuid>` directory removed on drop.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn create(parent: &Path) -> Result<Self> {
        let path = parent.join(format!("build-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).map_err(|e| RedactError::storage(path.display().to_string(), e))?;
        log::debug!("[Pipeline] work dir {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::warn!("[Pipeline] failed to remove {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<BundleFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, name: &str, result: Result<()>) {
        match result {
            Ok(()) => self.succeeded.push(name.to_string()),
            Err(e) => {
                log::warn!("[Pipeline] {} failed: {}", name, e);
                self.failed.push(BundleFailure {
                    name: name.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Decomposes a multi-page bundle into `pre` and redacts its full label and
/// OCR files into `output`.
fn prepare_document(
    bundle: &FileBundle,
    input: &LocalStorage,
    pre: &LocalStorage,
    output: &dyn Storage,
    config: &RedactConfig,
) -> Result<Vec<FileBundle>> {
    let renderer = fott_render::renderer_for(&input.path(&bundle.image_name))?;
    let pages = decompose(bundle, input, pre, renderer.as_ref(), config.render_dpi)?;
    redact_label_and_ocr(bundle, input, output, &RedactOptions::from(config))?;
    Ok(pages)
}

/// Redacts every complete bundle in `input` into `output`.
///
/// Multi-page documents (PDF, TIFF) are first split into per-page bundles
/// inside a temporary work directory. A failing bundle is reported and does
/// not stop the others.
pub fn run_batch(
    input: &LocalStorage,
    output: &dyn Storage,
    config: &RedactConfig,
) -> Result<BatchReport> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?;
    let work = WorkDir::create(&config.work_dir())?;
    let pre = LocalStorage::create(work.path().join("pre"))?;
    let options = RedactOptions::from(config);

    let documents = list_bundles(input, FileType::MultiPage)?;
    let singles = list_bundles(input, FileType::SinglePage)?;
    log::info!(
        "[Pipeline] {} multi-page and {} single-page bundles in {}",
        documents.len(),
        singles.len(),
        input.root().display()
    );

    let mut report = BatchReport::default();
    pool.install(|| {
        let prepared: Vec<(&FileBundle, Result<Vec<FileBundle>>)> = documents
            .par_iter()
            .map(|bundle| (bundle, prepare_document(bundle, input, &pre, output, config)))
            .collect();

        let mut pages = Vec::new();
        for (bundle, result) in prepared {
            match result {
                Ok(found) => {
                    report.record(&bundle.image_name, Ok(()));
                    pages.extend(found);
                }
                Err(e) => report.record(&bundle.image_name, Err(e)),
            }
        }

        let jobs: Vec<(&FileBundle, &dyn Storage)> = singles
            .iter()
            .map(|b| (b, input as &dyn Storage))
            .chain(pages.iter().map(|b| (b, &pre as &dyn Storage)))
            .collect();
        let results: Vec<(&FileBundle, Result<()>)> = jobs
            .into_par_iter()
            .map(|(bundle, source)| (bundle, redact_bundle(bundle, source, output, &options)))
            .collect();

        for (bundle, result) in results {
            report.record(&bundle.image_name, result);
        }
    });

    log::info!(
        "[Pipeline] done: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{label_json, ocr_v3_json, png_bytes, write_tiff};

    fn read_json(storage: &LocalStorage, name: &str) -> serde_json::Value {
        serde_json::from_slice(&storage.read(name).unwrap()).unwrap()
    }

    fn options() -> RedactOptions {
        RedactOptions {
            fields: FieldSelector::all(),
            api_version: ApiVersion::V3_0,
        }
    }

    #[test]
    fn test_redact_bundle_writes_three_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = LocalStorage::create(dir.path().join("in")).unwrap();
        let output = LocalStorage::create(dir.path().join("out")).unwrap();
        input.write("a.png", &png_bytes(100, 100)).unwrap();
        input.write("a.png.labels.json", &label_json(1)).unwrap();
        input.write("a.png.ocr.json", &ocr_v3_json(1)).unwrap();

        redact_bundle(&FileBundle::for_image("a.png"), &input, &output, &options()).unwrap();

        assert_eq!(
            output.list().unwrap(),
            vec!["redacted_a.png", "redacted_a.png.labels.json", "redacted_a.png.ocr.json"]
        );
        let ocr = read_json(&output, "redacted_a.png.ocr.json");
        assert_eq!(ocr["analyzeResult"]["content"], "Aaaa0");
        let label = read_json(&output, "redacted_a.png.labels.json");
        assert_eq!(label["labels"][0]["value"][0]["text"], "Aaaa0");

        let image =
            fott_image::load_image(&output.read("redacted_a.png").unwrap()).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(30, 20).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(80, 80).0, [0, 0, 0]);
    }

    #[test]
    fn test_redact_bundle_with_selector_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let input = LocalStorage::create(dir.path().join("in")).unwrap();
        let output = LocalStorage::create(dir.path().join("out")).unwrap();
        input.write("a.png.labels.json", &label_json(1)).unwrap();
        input.write("a.png.ocr.json", &ocr_v3_json(1)).unwrap();

        let options = RedactOptions {
            fields: FieldSelector::new(["Total"]),
            api_version: ApiVersion::V3_0,
        };
        redact_label_and_ocr(&FileBundle::for_image("a.png"), &input, &output, &options).unwrap();

        let before: serde_json::Value = serde_json::from_slice(&ocr_v3_json(1)).unwrap();
        assert_eq!(before, read_json(&output, "redacted_a.png.ocr.json"));
    }

    #[test]
    fn test_work_dir_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let work = WorkDir::create(dir.path()).unwrap();
            fs::write(work.path().join("x"), b"x").unwrap();
            assert!(work.path().file_name().unwrap().to_string_lossy().starts_with("build-"));
            work.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_run_batch() {
        let dir = tempfile::tempdir().unwrap();
        let input = LocalStorage::create(dir.path().join("in")).unwrap();
        let output = LocalStorage::create(dir.path().join("out")).unwrap();
        let work = dir.path().join("work");

        input.write("a.png", &png_bytes(100, 100)).unwrap();
        input.write("a.png.labels.json", &label_json(1)).unwrap();
        input.write("a.png.ocr.json", &ocr_v3_json(1)).unwrap();
        write_tiff(&input.path("b.tiff"), 2);
        input.write("b.tiff.labels.json", &label_json(2)).unwrap();
        input.write("b.tiff.ocr.json", &ocr_v3_json(2)).unwrap();
        input.write("notes.txt", b"ignored").unwrap();

        let config = RedactConfig {
            threads: 2,
            work_dir: Some(work.clone()),
            ..RedactConfig::default()
        };
        let report = run_batch(&input, &output, &config).unwrap();

        assert!(report.is_success(), "{:?}", report.failed);
        assert_eq!(report.succeeded.len(), 4);
        let written = output.list().unwrap();
        for name in [
            "redacted_a.png",
            "redacted_b.tiff.labels.json",
            "redacted_b.tiff.ocr.json",
            "redacted_b.tiff.001.rendered.png",
            "redacted_b.tiff.002.rendered.png.labels.json",
            "redacted_b.tiff.002.rendered.png.ocr.json",
        ] {
            assert!(written.iter().any(|w| w == name), "missing {name}");
        }
        assert_eq!(written.len(), 11);

        let full = read_json(&output, "redacted_b.tiff.ocr.json");
        assert_eq!(full["analyzeResult"]["content"], "Aaaa0\nAaaa0");
        let page2 = read_json(&output, "redacted_b.tiff.002.rendered.png.ocr.json");
        assert_eq!(page2["analyzeResult"]["pages"][0]["words"][0]["content"], "Aaaa0");
        assert_eq!(page2["analyzeResult"]["content"], "Aaaa0");

        // Neither page's outputs carry any labeled text, its own or the other page's.
        for page in ["001", "002"] {
            for suffix in ["ocr.json", "labels.json"] {
                let name = format!("redacted_b.tiff.{page}.rendered.png.{suffix}");
                let text = String::from_utf8(output.read(&name).unwrap()).unwrap();
                assert!(!text.contains("John"), "{name} leaks text: {text}");
            }
        }

        // The build directory is gone.
        assert_eq!(fs::read_dir(&work).unwrap().count(), 0);
    }

    #[test]
    fn test_run_batch_reports_failures_without_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let input = LocalStorage::create(dir.path().join("in")).unwrap();
        let output = LocalStorage::create(dir.path().join("out")).unwrap();

        input.write("a.png", &png_bytes(100, 100)).unwrap();
        input.write("a.png.labels.json", &label_json(1)).unwrap();
        input.write("a.png.ocr.json", &ocr_v3_json(1)).unwrap();
        input.write("bad.jpg", b"not an image").unwrap();
        input.write("bad.jpg.labels.json", &label_json(1)).unwrap();
        input.write("bad.jpg.ocr.json", b"{").unwrap();

        let config = RedactConfig {
            work_dir: Some(dir.path().to_path_buf()),
            ..RedactConfig::default()
        };
        let report = run_batch(&input, &output, &config).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.succeeded, vec!["a.png"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "bad.jpg");
    }
}
