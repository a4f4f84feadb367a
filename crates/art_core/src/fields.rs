//! Physical fields carried by simulation cells.
//!
//! Every transfer function and every raw film channel addresses fields by
//! index into a `FieldSet`. The active `FieldSet` is the one place that fixes
//! which field lives at which index; the two historical layouts (13 and 9
//! entries) are exposed as profiles of the same enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving field names or building a field set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Unknown field name: {0}")]
    UnknownName(String),

    #[error("Field index {index} out of range (field set has {len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Field {0} is not part of the active field set")]
    NotInSet(Field),

    #[error("Field {0} listed twice")]
    Duplicate(Field),

    #[error("Field set is empty")]
    Empty,
}

pub type FieldResult<T> = Result<T, FieldError>;

/// A physical quantity that can be sampled along a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Density,
    Utherm,
    Pressure,
    Energy,
    VelX,
    VelY,
    VelZ,
    VelDiv,
    VelCurl,
    Potential,
    Metallicity,
    ElectronFraction,
    Sfr,
    Entropy,
    BMag,
    ShockHeating,
}

impl Field {
    /// Every known field, in canonical order.
    pub const ALL: [Field; 16] = [
        Field::Density,
        Field::Utherm,
        Field::Pressure,
        Field::Energy,
        Field::VelX,
        Field::VelY,
        Field::VelZ,
        Field::VelDiv,
        Field::VelCurl,
        Field::Potential,
        Field::Metallicity,
        Field::ElectronFraction,
        Field::Sfr,
        Field::Entropy,
        Field::BMag,
        Field::ShockHeating,
    ];

    /// Canonical name used in transfer function directives and exports.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Density => "Density",
            Field::Utherm => "Utherm",
            Field::Pressure => "Pressure",
            Field::Energy => "Energy",
            Field::VelX => "VelX",
            Field::VelY => "VelY",
            Field::VelZ => "VelZ",
            Field::VelDiv => "VelDiv",
            Field::VelCurl => "VelCurl",
            Field::Potential => "Potential",
            Field::Metallicity => "Metallicity",
            Field::ElectronFraction => "NE",
            Field::Sfr => "SFR",
            Field::Entropy => "Entropy",
            Field::BMag => "BMag",
            Field::ShockHeating => "ShockHeating",
        }
    }

    /// Alternative spellings accepted by `Field::from_name`.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Density => &["dens", "rho"],
            Field::Utherm => &["temp", "temperature", "internalenergy"],
            Field::Pressure => &["pres"],
            Field::Energy => &["totalenergy"],
            Field::VelX => &["vx"],
            Field::VelY => &["vy"],
            Field::VelZ => &["vz"],
            Field::VelDiv => &["divergence"],
            Field::VelCurl => &["curl", "vorticity"],
            Field::Potential => &["pot"],
            Field::Metallicity => &["metals", "z"],
            Field::ElectronFraction => &["electronfraction", "electronabundance"],
            Field::Sfr => &["starformationrate"],
            Field::Entropy => &["s"],
            Field::BMag => &["bfield", "magneticfield"],
            Field::ShockHeating => &["shockdp", "shock"],
        }
    }

    /// Resolve a field by name, ignoring case, `_` and `-`.
    pub fn from_name(name: &str) -> Option<Field> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        Field::ALL.iter().copied().find(|field| {
            normalize(field.name()) == wanted || field.aliases().iter().any(|a| *a == wanted)
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered list of fields defining the `vals[]` index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    /// Build a field set from an explicit ordering.
    pub fn new(fields: Vec<Field>) -> FieldResult<Self> {
        if fields.is_empty() {
            return Err(FieldError::Empty);
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].contains(field) {
                return Err(FieldError::Duplicate(*field));
            }
        }
        Ok(Self { fields })
    }

    /// The 13-entry layout: hydrodynamics, velocities, potential, chemistry.
    pub fn full() -> Self {
        Self {
            fields: Field::ALL[..13].to_vec(),
        }
    }

    /// The 9-entry layout: hydrodynamic quantities and velocities only.
    pub fn compact() -> Self {
        Self {
            fields: Field::ALL[..9].to_vec(),
        }
    }

    /// Build a field set from field names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> FieldResult<Self> {
        let fields = names
            .iter()
            .map(|name| {
                Field::from_name(name.as_ref())
                    .ok_or_else(|| FieldError::UnknownName(name.as_ref().to_string()))
            })
            .collect::<FieldResult<Vec<_>>>()?;
        Self::new(fields)
    }

    /// Number of fields (the length of every `vals[]` array).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Index of a field, if it is part of the set.
    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    /// Field stored at an index.
    pub fn field_at(&self, index: usize) -> Option<Field> {
        self.fields.get(index).copied()
    }

    /// Check that an index addresses a field of this set.
    pub fn check_index(&self, index: usize) -> FieldResult<usize> {
        if index < self.fields.len() {
            Ok(index)
        } else {
            Err(FieldError::IndexOutOfRange {
                index,
                len: self.fields.len(),
            })
        }
    }

    /// Resolve a directive token: either a numeric index or a field name.
    pub fn resolve(&self, token: &str) -> FieldResult<usize> {
        if let Ok(index) = token.parse::<usize>() {
            return self.check_index(index);
        }
        let field =
            Field::from_name(token).ok_or_else(|| FieldError::UnknownName(token.to_string()))?;
        self.index_of(field).ok_or(FieldError::NotInSet(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }

    /// Canonical names in index order.
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(Field::name).collect()
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::full()
    }
}
