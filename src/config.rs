use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::DetectorConfig;
use crate::detection::guides::GuideLayout;
use crate::detection::preprocessing::PreprocessConfig;
use crate::error::Result;
use crate::session::SessionConfig;
use crate::stabilizer::StabilizerConfig;

/// Everything a scan session needs, supplied once at session start
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub preprocess: PreprocessConfig,
    pub detector: DetectorConfig,
    pub stabilizer: StabilizerConfig,
    pub session: SessionConfig,
    pub layout: GuideLayout,
}

impl ScannerConfig {
    /// Single document quad anywhere in the frame
    pub fn document() -> Self {
        Self::default()
    }

    /// Four dark corner markers, one per corner guide box
    pub fn markers() -> Self {
        Self {
            preprocess: PreprocessConfig::markers(),
            detector: DetectorConfig::markers(),
            layout: GuideLayout::corners(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }
}
