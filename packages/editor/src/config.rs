use crate::EditorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "resume-editor.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub images: ImageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Upper bound on undo levels
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiet period that closes a burst of edits into one history entry
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    #[serde(default = "default_min_row_height")]
    pub min_row_height: u32,

    #[serde(default = "default_min_column_width")]
    pub min_column_width: u32,

    /// Width reported for columns no cell sizes explicitly
    #[serde(default = "default_column_width")]
    pub default_column_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(default = "default_min_image_size")]
    pub min_size: f64,
}

fn default_max_size() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_min_row_height() -> u32 {
    32
}

fn default_min_column_width() -> u32 {
    60
}

fn default_column_width() -> u32 {
    120
}

fn default_min_image_size() -> f64 {
    16.0
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_row_height: default_min_row_height(),
            min_column_width: default_min_column_width(),
            default_column_width: default_column_width(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_image_size(),
        }
    }
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when no file exists
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        if config.table.min_row_height == 0 || config.table.min_column_width == 0 {
            return Err(EditorError::Config(
                "table minimums must be positive".to_string(),
            ));
        }
        Ok(config)
    }
}
