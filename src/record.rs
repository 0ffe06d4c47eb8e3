//! Raw entity records as supplied by a data source
//!
//! Field names follow the layout engine's vocabulary; serde aliases accept
//! the column headers of the institution download dataset (`InstitutionName`,
//! `Country`, `total`, `Year`) so that converted spreadsheets load unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A loosely typed scalar cell: tabular sources mix numbers and strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric reading of the cell, if it has one
    ///
    /// Text is trimmed and parsed; anything unparseable yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Textual key for joins and lookups
    ///
    /// `2014`, `2014.0` and the text `"2014.0"` all give `"2014"`. Other text
    /// is only trimmed, so `"007"` keeps its leading zeros.
    pub fn as_key(&self) -> String {
        match self {
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => float_key(*f),
            Scalar::Text(s) => {
                let s = s.trim();
                match s.parse::<f64>() {
                    Ok(f) if s.contains('.') && integral(f) => float_key(f),
                    _ => s.to_string(),
                }
            }
        }
    }
}

fn integral(f: f64) -> bool {
    f.fract() == 0.0 && f.abs() < 1e15
}

fn float_key(f: f64) -> String {
    if integral(f) {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

/// One entity before it becomes a simulation node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Stable identifier; required
    #[serde(default)]
    pub id: Option<Scalar>,

    /// Display name
    #[serde(default, alias = "InstitutionName")]
    pub name: Option<String>,

    /// Category label used for colouring (e.g. country)
    #[serde(default, alias = "Country")]
    pub category: Option<String>,

    /// Raw data value (downloads, citations, ...)
    #[serde(default, alias = "total")]
    pub magnitude: Option<Scalar>,

    /// Group key selecting a target center in split mode (e.g. year)
    #[serde(default, alias = "Year")]
    pub group: Option<Scalar>,
}

impl RawRecord {
    /// Create a record with an id and a magnitude
    pub fn new(id: impl Into<Scalar>, magnitude: impl Into<Scalar>) -> Self {
        Self {
            id: Some(id.into()),
            magnitude: Some(magnitude.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<Scalar>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The id as a join key, or `None` when missing or blank
    pub fn key(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(Scalar::as_key)
            .filter(|key| !key.is_empty())
    }

    /// The group key, empty when the record has none
    pub fn group_key(&self) -> String {
        self.group.as_ref().map(Scalar::as_key).unwrap_or_default()
    }
}
