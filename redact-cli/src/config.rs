use std::fs;
use std::path::{Path, PathBuf};

use fott_core::ApiVersion;
use fott_rules::FieldSelector;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RENDER_DPI: u32 = 300;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RedactConfig {
    /// Label fields to redact; empty redacts every field.
    pub fields_to_redact: FieldSelector,
    /// Version of the OCR results being redacted.
    pub api_version: ApiVersion,
    /// Resolution for rendering PDF pages.
    pub render_dpi: u32,
    /// Batch worker threads; 0 lets rayon decide.
    pub threads: usize,
    /// Parent of the per-run build directory; the system temp dir if unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            fields_to_redact: FieldSelector::all(),
            api_version: ApiVersion::default(),
            render_dpi: DEFAULT_RENDER_DPI,
            threads: 0,
            work_dir: None,
        }
    }
}

impl RedactConfig {
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<RedactConfig, ConfigError> {
    if !path.exists() {
        log::debug!("[Config] {} not found, using defaults", path.display());
        return Ok(RedactConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(raw.trim_start_matches('\u{feff}'))?)
}

pub fn save_config(path: &Path, config: &RedactConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}
