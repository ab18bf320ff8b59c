use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::axis::{XType, YScaleType};
use crate::chart::smoothing::SmoothingConfig;
use crate::chart::tooltip::{TooltipPosition, TooltipSortingMethod};
use crate::color::PaletteKind;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "RUNLENS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Viewer startup settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Debounce before a chart rebuild, in milliseconds.
    pub build_delay_ms: u64,
    pub smoothing_enabled: bool,
    pub smoothing_weight: f64,
    pub x_type: XType,
    pub y_scale: YScaleType,
    pub tooltip_sorting: TooltipSortingMethod,
    pub tooltip_position: TooltipPosition,
    pub ignore_outliers: bool,
    pub palette: PaletteKind,
    /// Selector persistence file; `None` keeps selections in memory.
    pub storage_path: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            build_delay_ms: 350,
            smoothing_enabled: true,
            smoothing_weight: 0.6,
            x_type: XType::default(),
            y_scale: YScaleType::default(),
            tooltip_sorting: TooltipSortingMethod::default(),
            tooltip_position: TooltipPosition::default(),
            ignore_outliers: false,
            palette: PaletteKind::default(),
            storage_path: default_storage_path(),
        }
    }
}

impl ViewerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `$RUNLENS_CONFIG` if set, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                let path = PathBuf::from(path.trim());
                log::info!("loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn build_delay(&self) -> Duration {
        Duration::from_millis(self.build_delay_ms)
    }

    pub fn smoothing(&self) -> SmoothingConfig {
        SmoothingConfig::new(self.smoothing_enabled, self.smoothing_weight)
    }
}

fn default_storage_path() -> Option<PathBuf> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let mut home = PathBuf::from(std::env::var("HOME").ok()?);
            home.push(".config");
            home
        }
    };
    Some(base.join("runlens").join("selection.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runlens.json");
        std::fs::write(
            &path,
            r#"{ "build_delay_ms": 100, "x_type": "wall_time", "tooltip_sorting": "nearest" }"#,
        )
        .unwrap();

        let config = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config.build_delay(), Duration::from_millis(100));
        assert_eq!(config.x_type, XType::WallTime);
        assert_eq!(config.tooltip_sorting, TooltipSortingMethod::Nearest);
        assert_eq!(config.smoothing_weight, 0.6);
        assert!(config.smoothing_enabled);
    }

    #[test]
    fn out_of_range_weight_is_clamped() {
        let config = ViewerConfig {
            smoothing_weight: 4.0,
            ..ViewerConfig::default()
        };
        assert_eq!(config.smoothing().weight, 1.0);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runlens.json");
        std::fs::write(&path, "{ build_delay_ms: }").unwrap();
        assert!(matches!(
            ViewerConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
