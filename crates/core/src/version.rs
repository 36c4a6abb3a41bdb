//! OCR API versions and the result schema each one produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Layout of an OCR result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OcrSchema {
    /// `readResults` tree; table cells point at words by path.
    V2,
    /// Global `content` string; lines, words and cells address it by span.
    V3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[allow(non_camel_case_types)]
pub enum ApiVersion {
    V2_0,
    V2_1,
    #[default]
    V3_0,
    V2021_09_30Preview,
    V2022_08_31,
}

impl ApiVersion {
    pub fn schema(&self) -> OcrSchema {
        match self {
            ApiVersion::V2_0 | ApiVersion::V2_1 => OcrSchema::V2,
            ApiVersion::V3_0 | ApiVersion::V2021_09_30Preview | ApiVersion::V2022_08_31 => {
                OcrSchema::V3
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V2_0 => "v2.0",
            ApiVersion::V2_1 => "v2.1",
            ApiVersion::V3_0 => "v3.0",
            ApiVersion::V2021_09_30Preview => "2021-09-30-preview",
            ApiVersion::V2022_08_31 => "2022-08-31",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "v2.0" => Ok(ApiVersion::V2_0),
            "v2.1" => Ok(ApiVersion::V2_1),
            "v3.0" => Ok(ApiVersion::V3_0),
            "2021-09-30-preview" => Ok(ApiVersion::V2021_09_30Preview),
            "2022-08-31" => Ok(ApiVersion::V2022_08_31),
            other => Err(CoreError::UnsupportedApiVersion(other.to_string())),
        }
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApiVersion> for String {
    fn from(value: ApiVersion) -> Self {
        value.as_str().to_string()
    }
}
