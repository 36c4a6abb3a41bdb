use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("{name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] fott_core::CoreError),

    #[error(transparent)]
    Image(#[from] fott_image::ImageRedactError),

    #[error(transparent)]
    Ocr(#[from] fott_ocr::OcrError),

    #[error(transparent)]
    Render(#[from] fott_render::RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl RedactError {
    pub fn storage(name: impl Into<String>, source: std::io::Error) -> Self {
        RedactError::Storage {
            name: name.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RedactError>;
