//! Discrete color tables for the table-driven transfer functions.
//!
//! A color table is an evenly spaced list of RGB entries. Tables are looked up
//! by name through a `ColorTableLibrary`, which knows a few built-in tables and
//! loads anything else from `<name>.tbl` files under a base directory.
//!
//! # Table file format
//!
//! One `r g b` triple per line, whitespace separated. Blank lines and lines
//! starting with `#` are skipped. If any component exceeds 1.0 the whole table
//! is treated as 8-bit and divided by 255.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use art_math::Color;
use thiserror::Error;

/// File extension of color table files.
pub const COLOR_TABLE_EXTENSION: &str = "tbl";

/// Errors that can occur while resolving or loading a color table.
#[derive(Error, Debug)]
pub enum ColorTableError {
    #[error("Unknown color table: {0}")]
    Unknown(String),

    #[error("Failed to read color table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed color table {name} at line {line}: {message}")]
    Malformed {
        name: String,
        line: usize,
        message: String,
    },

    #[error("Color table {name} has {len} entries, need at least 2")]
    TooShort { name: String, len: usize },
}

pub type ColorTableResult<T> = Result<T, ColorTableError>;

/// A named, evenly stepped list of colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    name: String,
    colors: Vec<Color>,
}

impl ColorTable {
    /// Create a table, rejecting tables with fewer than two entries.
    pub fn new(name: impl Into<String>, colors: Vec<Color>) -> ColorTableResult<Self> {
        let name = name.into();
        if colors.len() < 2 {
            return Err(ColorTableError::TooShort {
                name,
                len: colors.len(),
            });
        }
        Ok(Self { name, colors })
    }

    /// Parse the text form of a table.
    pub fn parse(name: impl Into<String>, contents: &str) -> ColorTableResult<Self> {
        let name = name.into();
        let mut colors = Vec::new();

        for (i, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let values = trimmed
                .split_whitespace()
                .map(|tok| tok.parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ColorTableError::Malformed {
                    name: name.clone(),
                    line: i + 1,
                    message: e.to_string(),
                })?;

            if values.len() != 3 {
                return Err(ColorTableError::Malformed {
                    name,
                    line: i + 1,
                    message: format!("expected 3 components, found {}", values.len()),
                });
            }
            colors.push(Color::new(values[0], values[1], values[2]));
        }

        if colors.iter().any(|c| c.max_element() > 1.0) {
            for c in &mut colors {
                *c /= 255.0;
            }
        }

        Self::new(name, colors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Entry at an index, clamped to the last entry.
    pub fn color(&self, index: usize) -> Color {
        self.colors[index.min(self.colors.len() - 1)]
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Entries flattened to `[r0, g0, b0, r1, ...]`.
    pub fn to_flat(&self) -> Vec<f32> {
        self.colors.iter().flat_map(|c| c.to_array()).collect()
    }
}

/// Names of the tables available without any file on disk.
pub const BUILTIN_TABLES: [&str; 4] = ["grayscale", "blue-red", "hot", "cool-warm"];

fn builtin(name: &str) -> Option<ColorTable> {
    let colors = match name {
        "grayscale" => vec![Color::ZERO, Color::ONE],
        "blue-red" => vec![
            Color::new(0.0, 0.0, 1.0),
            Color::new(0.25, 0.0, 0.75),
            Color::new(0.5, 0.0, 0.5),
            Color::new(0.75, 0.0, 0.25),
            Color::new(1.0, 0.0, 0.0),
        ],
        "hot" => vec![
            Color::ZERO,
            Color::new(1.0, 0.0, 0.0),
            Color::new(1.0, 1.0, 0.0),
            Color::ONE,
        ],
        "cool-warm" => vec![
            Color::new(0.230, 0.299, 0.754),
            Color::new(0.865, 0.865, 0.865),
            Color::new(0.706, 0.016, 0.150),
        ],
        _ => return None,
    };
    Some(ColorTable {
        name: name.to_string(),
        colors,
    })
}

/// Cache of color tables keyed by name.
///
/// Tables are resolved on first use and shared afterwards.
#[derive(Debug, Default)]
pub struct ColorTableLibrary {
    /// Cached tables by name
    tables: HashMap<String, Arc<ColorTable>>,

    /// Directory searched for `<name>.tbl` files
    base_dir: Option<PathBuf>,
}

impl ColorTableLibrary {
    /// Create an empty library that only knows the built-in tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library that also searches `base_dir` for table files.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            tables: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Register a table under its own name, replacing any previous entry.
    pub fn insert(&mut self, table: ColorTable) -> Arc<ColorTable> {
        let table = Arc::new(table);
        self.tables.insert(table.name.clone(), table.clone());
        table
    }

    /// Resolve a table by name: cache, then built-ins, then `<base_dir>/<name>.tbl`.
    pub fn load(&mut self, name: &str) -> ColorTableResult<Arc<ColorTable>> {
        if let Some(table) = self.tables.get(name) {
            return Ok(table.clone());
        }

        let table = match builtin(name) {
            Some(table) => table,
            None => self.load_file(name)?,
        };

        log::debug!("Loaded color table: {} ({} entries)", name, table.len());
        Ok(self.insert(table))
    }

    /// Get a cached table without loading.
    pub fn get(&self, name: &str) -> Option<Arc<ColorTable>> {
        self.tables.get(name).cloned()
    }

    /// Get the number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn load_file(&self, name: &str) -> ColorTableResult<ColorTable> {
        let base = self
            .base_dir
            .as_ref()
            .ok_or_else(|| ColorTableError::Unknown(name.to_string()))?;
        let path = table_path(base, name);
        if !path.is_file() {
            return Err(ColorTableError::Unknown(name.to_string()));
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ColorTableError::Io {
            path: path.clone(),
            source,
        })?;
        ColorTable::parse(name, &contents)
    }
}

fn table_path(base: &Path, name: &str) -> PathBuf {
    base.join(format!("{}.{}", name, COLOR_TABLE_EXTENSION))
}
