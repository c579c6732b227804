//! # Labeled Grid Model
//!
//! In-memory representation of the multi-dimensional labeled arrays that flow
//! between stages: ordered dimensions, coordinate variables (numeric or text),
//! data variables backed by [`ndarray::ArrayD`], and attribute maps.
//!
//! Missing values are always `NaN` in memory. Fill values only exist at the
//! file boundary (see [`crate::netcdf_io`]).

use crate::error::{StatsError, StatsResult};
use ndarray::ArrayD;
use std::collections::BTreeMap;

/// A single attribute value, reduced to the kinds this pipeline reads and writes
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Texts(Vec<String>),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

/// Attribute dictionary, kept sorted so written files are reproducible
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    /// Text value of an attribute, `None` when absent or not text
    pub fn text(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(AttrValue::as_text)
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Extends a text attribute with a new clause, separated by a space.
    /// Sets the attribute when it does not exist yet.
    pub fn append_text(&mut self, name: &str, clause: &str) {
        let value = match self.text(name) {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim_end(), clause),
            _ => clause.to_string(),
        };
        self.set(name, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Values of a one-dimensional coordinate variable
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl CoordValues {
    pub(crate) fn len(&self) -> usize {
        match self {
            CoordValues::Numeric(v) => v.len(),
            CoordValues::Text(v) => v.len(),
        }
    }
}

/// A coordinate variable laid along at most one dimension.
///
/// `name` and `dim` differ for auxiliary coordinates such as `warming_level`,
/// which labels the `period` dimension. Scalar coordinates have no `dim` and
/// exactly one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub name: String,
    pub dim: Option<String>,
    pub values: CoordValues,
    pub attrs: Attributes,
}

impl Coordinate {
    pub fn numeric(name: &str, values: Vec<f64>, attrs: Attributes) -> Self {
        Coordinate {
            name: name.to_string(),
            dim: Some(name.to_string()),
            values: CoordValues::Numeric(values),
            attrs,
        }
    }

    pub fn text(name: &str, dim: &str, values: Vec<String>) -> Self {
        Coordinate {
            name: name.to_string(),
            dim: Some(dim.to_string()),
            values: CoordValues::Text(values),
            attrs: Attributes::new(),
        }
    }

    pub fn scalar(name: &str, value: f64, attrs: Attributes) -> Self {
        Coordinate {
            name: name.to_string(),
            dim: None,
            values: CoordValues::Numeric(vec![value]),
            attrs,
        }
    }
}

/// A data variable: named array plus the dimension name of every axis
#[derive(Debug, Clone)]
pub struct GridVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub attrs: Attributes,
}

impl GridVariable {
    pub fn new(name: &str, dims: Vec<String>, data: ArrayD<f64>, attrs: Attributes) -> StatsResult<Self> {
        if dims.len() != data.ndim() {
            return Err(StatsError::Dimensions {
                name: name.to_string(),
                expected: dims,
                found: data.shape().iter().map(|n| n.to_string()).collect(),
            });
        }
        Ok(GridVariable {
            name: name.to_string(),
            dims,
            data,
            attrs,
        })
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }
}

/// A dataset ready to be written: dimensions, coordinates, data variables and
/// global attributes.
#[derive(Debug, Clone, Default)]
pub struct GridDataset {
    pub dims: Vec<(String, usize)>,
    pub coords: Vec<Coordinate>,
    pub data_vars: Vec<GridVariable>,
    pub attrs: Attributes,
}

impl GridDataset {
    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims.iter().find(|(d, _)| d == name).map(|(_, n)| *n)
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name == name)
    }

    pub fn data_var(&self, name: &str) -> Option<&GridVariable> {
        self.data_vars.iter().find(|v| v.name == name)
    }

    /// Replaces a coordinate of the same name, or adds it
    pub fn assign_coord(&mut self, coord: Coordinate) {
        match self.coords.iter_mut().find(|c| c.name == coord.name) {
            Some(existing) => *existing = coord,
            None => self.coords.push(coord),
        }
    }

    /// Checks that every variable and coordinate agrees with the declared
    /// dimension lengths.
    pub fn validate(&self) -> StatsResult<()> {
        for coord in &self.coords {
            let expected = match &coord.dim {
                Some(dim) => self.dim_len(dim).ok_or_else(|| {
                    StatsError::Config(format!(
                        "coordinate '{}' uses undeclared dimension '{}'",
                        coord.name, dim
                    ))
                })?,
                None => 1,
            };
            if coord.values.len() != expected {
                return Err(StatsError::Dimensions {
                    name: coord.name.clone(),
                    expected: vec![expected.to_string()],
                    found: vec![coord.values.len().to_string()],
                });
            }
        }
        for var in &self.data_vars {
            let expected: Option<Vec<usize>> = var.dims.iter().map(|d| self.dim_len(d)).collect();
            let expected = expected.ok_or_else(|| {
                StatsError::Config(format!("variable '{}' uses an undeclared dimension", var.name))
            })?;
            if expected.as_slice() != var.data.shape() {
                return Err(StatsError::Dimensions {
                    name: var.name.clone(),
                    expected: expected.iter().map(|n| n.to_string()).collect(),
                    found: var.data.shape().iter().map(|n| n.to_string()).collect(),
                });
            }
        }
        Ok(())
    }
}
