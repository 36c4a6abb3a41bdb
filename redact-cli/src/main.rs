//! fott-redact
//!
//! Command line redaction of labeled form documents.
//!
//! ```bash
//! fott-redact image scan.png scan.png.labels.json redacted_scan.png --fields Name,Date
//! fott-redact label scan.png.labels.json redacted_scan.png.labels.json
//! fott-redact ocr scan.png.ocr.json scan.png.labels.json redacted_scan.png.ocr.json \
//!     --api-version v2.1
//! fott-redact batch ./input ./output --dpi 200 --threads 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fott_core::{ApiVersion, LabelDocument};
use fott_redact::{load_config, run_batch, LocalStorage};
use fott_rules::FieldSelector;
use tracing::info;

#[derive(Parser)]
#[command(name = "fott-redact")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Redact page images, label files and OCR results of labeled documents",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Paint labeled regions of an image white
    Image {
        image: PathBuf,
        label: PathBuf,
        output: PathBuf,

        /// Comma separated field names; all fields when omitted
        #[arg(long, default_value = "")]
        fields: String,
    },

    /// Mask the text of labeled entities
    Label {
        label: PathBuf,
        output: PathBuf,

        #[arg(long, default_value = "")]
        fields: String,
    },

    /// Mask the OCR words under labeled regions
    Ocr {
        ocr: PathBuf,
        label: PathBuf,
        output: PathBuf,

        #[arg(long = "api-version", default_value = "v3.0", env = "FOTT_API_VERSION")]
        api_version: ApiVersion,

        #[arg(long, default_value = "")]
        fields: String,
    },

    /// Redact every complete bundle in a directory
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,

        /// JSON config file; flags given here override it
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long = "api-version", env = "FOTT_API_VERSION")]
        api_version: Option<ApiVersion>,

        #[arg(long)]
        fields: Option<String>,

        /// PDF render resolution
        #[arg(long, env = "FOTT_RENDER_DPI")]
        dpi: Option<u32>,

        /// Worker threads, 0 for one per core
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn read_label(path: &Path) -> anyhow::Result<LabelDocument> {
    fott_core::from_json_slice(&read(path)?)
        .with_context(|| format!("invalid label file {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Image {
            image,
            label,
            output,
            fields,
        } => {
            let label = read_label(&label)?;
            let bytes = fott_image::redact_image_bytes(
                &read(&image)?,
                &label,
                &output.to_string_lossy(),
                &FieldSelector::parse(&fields),
            )?;
            write(&output, &bytes)?;
            info!("Wrote {}", output.display());
        }
        Commands::Label { label, output, fields } => {
            let bytes =
                fott_label::redact_label_bytes(&read(&label)?, &FieldSelector::parse(&fields))?;
            write(&output, &bytes)?;
            info!("Wrote {}", output.display());
        }
        Commands::Ocr {
            ocr,
            label,
            output,
            api_version,
            fields,
        } => {
            let label = read_label(&label)?;
            let bytes = fott_ocr::redact_ocr(
                &read(&ocr)?,
                &label,
                api_version,
                &FieldSelector::parse(&fields),
            )?;
            write(&output, &bytes)?;
            info!("Wrote {}", output.display());
        }
        Commands::Batch {
            input_dir,
            output_dir,
            config,
            api_version,
            fields,
            dpi,
            threads,
        } => {
            let mut settings = match &config {
                Some(path) => load_config(path)?,
                None => Default::default(),
            };
            if let Some(version) = api_version {
                settings.api_version = version;
            }
            if let Some(fields) = fields {
                settings.fields_to_redact = FieldSelector::parse(&fields);
            }
            if let Some(dpi) = dpi {
                settings.render_dpi = dpi;
            }
            if let Some(threads) = threads {
                settings.threads = threads;
            }

            info!(
                "Redacting {} into {} (api {}, {} dpi)",
                input_dir.display(),
                output_dir.display(),
                settings.api_version,
                settings.render_dpi
            );
            let input = LocalStorage::new(input_dir);
            let output = LocalStorage::create(output_dir)?;
            let report = run_batch(&input, &output, &settings)?;

            for failure in &report.failed {
                tracing::error!("{}: {}", failure.name, failure.error);
            }
            info!("{} bundles redacted, {} failed", report.succeeded.len(), report.failed.len());
            if !report.is_success() {
                anyhow::bail!("{} bundles failed", report.failed.len());
            }
        }
    }

    Ok(())
}
