//! JSON scene configuration.
//!
//! Every section and field has a default, so a configuration file only needs
//! to spell out what differs:
//!
//! ```json
//! {
//!   "film": { "x_resolution": 256, "y_resolution": 256, "filename": "out/dens" },
//!   "filter": { "type": "gaussian", "x_width": 1.5, "y_width": 1.5, "alpha": 2.0 },
//!   "fields": "full",
//!   "transfer": {
//!     "sigma_a": [0.0, 0.0, 0.0],
//!     "directives": ["gaussian Density 0.5 0.1 1.0 0.5 0.0"]
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::{FieldResult, FieldSet};

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top level scene description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub film: FilmSettings,
    pub filter: FilterSettings,
    pub fields: FieldProfile,
    pub transfer: TransferSettings,
    pub render: RenderSettings,
}

impl SceneConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        log::debug!("Loaded config {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(contents: &str) -> ConfigResult<Self> {
        let config: SceneConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let film = &self.film;
        if film.x_resolution == 0 || film.y_resolution == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be positive, got {}x{}",
                film.x_resolution, film.y_resolution
            )));
        }

        let [x0, x1, y0, y1] = film.crop_window;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(x0) && in_unit(x1) && in_unit(y0) && in_unit(y1)) || x0 > x1 || y0 > y1 {
            return Err(ConfigError::Invalid(format!(
                "crop window {:?} must be ordered bounds in [0, 1]",
                film.crop_window
            )));
        }

        if film.total_jobs == 0 {
            return Err(ConfigError::Invalid("total_jobs must be at least 1".into()));
        }

        let (xw, yw) = self.filter.widths();
        if !(xw > 0.0 && yw > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "filter widths must be positive, got {} x {}",
                xw, yw
            )));
        }

        if self.render.samples_per_pixel == 0 || self.render.bucket_size == 0 {
            return Err(ConfigError::Invalid(
                "samples_per_pixel and bucket_size must be positive".into(),
            ));
        }

        self.fields
            .to_field_set()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }
}

/// Film resolution, crop and output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmSettings {
    pub x_resolution: u32,
    pub y_resolution: u32,
    /// Fractional crop bounds `[x_min, x_max, y_min, y_max]`
    pub crop_window: [f64; 4],
    /// Output file stem; writers append suffixes and extensions
    pub filename: String,
    /// Keep a preview buffer for progressive display
    pub open_window: bool,
    /// Number of render jobs the screen is split into
    pub total_jobs: u32,
    /// Worker slots for per-thread statistics (0 = rayon's thread count)
    pub num_threads: usize,
}

impl Default for FilmSettings {
    fn default() -> Self {
        Self {
            x_resolution: 400,
            y_resolution: 400,
            crop_window: [0.0, 1.0, 0.0, 1.0],
            filename: "frame".to_string(),
            open_window: false,
            total_jobs: 1,
            num_threads: 0,
        }
    }
}

/// Reconstruction filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterSettings {
    Box {
        #[serde(default = "default_box_width")]
        x_width: f32,
        #[serde(default = "default_box_width")]
        y_width: f32,
    },
    Triangle {
        #[serde(default = "default_wide_width")]
        x_width: f32,
        #[serde(default = "default_wide_width")]
        y_width: f32,
    },
    Gaussian {
        #[serde(default = "default_wide_width")]
        x_width: f32,
        #[serde(default = "default_wide_width")]
        y_width: f32,
        #[serde(default = "default_alpha")]
        alpha: f32,
    },
    Mitchell {
        #[serde(default = "default_wide_width")]
        x_width: f32,
        #[serde(default = "default_wide_width")]
        y_width: f32,
        #[serde(default = "default_mitchell")]
        b: f32,
        #[serde(default = "default_mitchell")]
        c: f32,
    },
}

impl FilterSettings {
    /// Half-widths of the filter support.
    pub fn widths(&self) -> (f32, f32) {
        match *self {
            FilterSettings::Box { x_width, y_width }
            | FilterSettings::Triangle { x_width, y_width }
            | FilterSettings::Gaussian {
                x_width, y_width, ..
            }
            | FilterSettings::Mitchell {
                x_width, y_width, ..
            } => (x_width, y_width),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings::Box {
            x_width: default_box_width(),
            y_width: default_box_width(),
        }
    }
}

fn default_box_width() -> f32 {
    0.5
}

fn default_wide_width() -> f32 {
    2.0
}

fn default_alpha() -> f32 {
    2.0
}

fn default_mitchell() -> f32 {
    1.0 / 3.0
}

/// Named field layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedProfile {
    Full,
    Compact,
}

/// Which field lives at which `vals[]` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldProfile {
    Named(NamedProfile),
    Custom(Vec<String>),
}

impl FieldProfile {
    pub fn to_field_set(&self) -> FieldResult<FieldSet> {
        match self {
            FieldProfile::Named(NamedProfile::Full) => Ok(FieldSet::full()),
            FieldProfile::Named(NamedProfile::Compact) => Ok(FieldSet::compact()),
            FieldProfile::Custom(names) => FieldSet::from_names(names),
        }
    }
}

impl Default for FieldProfile {
    fn default() -> Self {
        FieldProfile::Named(NamedProfile::Full)
    }
}

/// Transfer function construction settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Background absorption of the medium
    pub sigma_a: [f32; 3],
    /// One transfer function directive per entry
    pub directives: Vec<String>,
    /// Directory searched for color table files
    pub color_table_dir: Option<PathBuf>,
}

/// Sampling settings for the render driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub samples_per_pixel: u32,
    pub bucket_size: u32,
    pub splat_scale: f32,
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            samples_per_pixel: 4,
            bucket_size: 32,
            splat_scale: 1.0,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SceneConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.film.crop_window, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(config.filter.widths(), (0.5, 0.5));
        assert_eq!(config.fields.to_field_set().unwrap().len(), 13);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "film": { "x_resolution": 64, "y_resolution": 32, "filename": "out/test" },
            "filter": { "type": "mitchell", "x_width": 1.5, "y_width": 1.5 },
            "fields": "compact",
            "transfer": {
                "sigma_a": [0.1, 0.2, 0.3],
                "directives": ["constant Density 1 0 0"]
            },
            "render": { "samples_per_pixel": 8 }
        }"#;
        let config = SceneConfig::from_json_str(json).unwrap();

        assert_eq!(config.film.x_resolution, 64);
        assert_eq!(config.film.filename, "out/test");
        assert!(matches!(
            config.filter,
            FilterSettings::Mitchell { x_width, .. } if x_width == 1.5
        ));
        assert_eq!(config.fields, FieldProfile::Named(NamedProfile::Compact));
        assert_eq!(config.transfer.directives.len(), 1);
        assert_eq!(config.render.samples_per_pixel, 8);
        assert_eq!(config.render.bucket_size, 32);
    }

    #[test]
    fn test_custom_field_profile() {
        let json = r#"{ "fields": ["Density", "Entropy"] }"#;
        let config = SceneConfig::from_json_str(json).unwrap();
        let set = config.fields.to_field_set().unwrap();
        assert_eq!(set.names(), vec!["Density", "Entropy"]);

        let bad = r#"{ "fields": ["Density", "Nope"] }"#;
        assert!(matches!(
            SceneConfig::from_json_str(bad),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_configs() {
        let zero_res = r#"{ "film": { "x_resolution": 0 } }"#;
        assert!(matches!(
            SceneConfig::from_json_str(zero_res),
            Err(ConfigError::Invalid(_))
        ));

        let bad_crop = r#"{ "film": { "crop_window": [0.6, 0.4, 0.0, 1.0] } }"#;
        assert!(matches!(
            SceneConfig::from_json_str(bad_crop),
            Err(ConfigError::Invalid(_))
        ));

        let bad_filter = r#"{ "filter": { "type": "box", "x_width": 0.0 } }"#;
        assert!(matches!(
            SceneConfig::from_json_str(bad_filter),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            SceneConfig::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
