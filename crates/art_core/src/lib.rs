//! ART Core - physical fields, color tables and scene configuration.
//!
//! This crate provides:
//!
//! - **Field enumeration**: `Field` and the `FieldSet` profiles that fix the
//!   index space of every `vals[]` array handed to transfer functions
//! - **Color tables**: named discrete color tables and a caching loader
//! - **Configuration**: the JSON scene description read by the `art` binary
//!
//! # Example
//!
//! ```ignore
//! use art_core::config::SceneConfig;
//!
//! let config = SceneConfig::load("scene.json")?;
//! let fields = config.fields.to_field_set()?;
//! println!("{} fields, density at index {:?}",
//!     fields.len(),
//!     fields.index_of(art_core::Field::Density));
//! ```

pub mod color_table;
pub mod config;
pub mod fields;

// Re-export commonly used types
pub use color_table::{ColorTable, ColorTableError, ColorTableLibrary};
pub use config::{ConfigError, FieldProfile, FilterSettings, SceneConfig};
pub use fields::{Field, FieldError, FieldSet};
