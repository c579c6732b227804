//! # NetCDF Reading and Writing
//!
//! Reading converts everything to `f64` with missing values as `NaN`
//! (`_FillValue` / `missing_value` masked, `scale_factor` / `add_offset`
//! applied). Daily grids are read in latitude slabs so a whole multi-decadal
//! series never has to be resident at once.
//!
//! Writing takes a [`GridDataset`] and one [`VariableEncoding`] for its data
//! variables. Coordinates are always written as 64-bit floats (or strings)
//! without a fill value.

use crate::error::{StatsError, StatsResult};
use crate::grid::{AttrValue, Attributes, CoordValues, Coordinate, GridDataset, GridVariable};
use log::debug;
use ndarray::{Array3, ArrayD, Ix3};
use netcdf::types::NcVariableType;
use netcdf::{AttributeValue, File, Variable};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// Attributes consumed on read and regenerated from the encoding on write
const ENCODING_ATTRIBUTES: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

/// On-disk storage type of a data variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    F32,
    F64,
    I16,
}

/// How data variables of one output file are stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableEncoding {
    pub dtype: StorageType,
    /// zlib deflate level, `None` for uncompressed
    pub deflate: Option<i32>,
    /// Value written in place of `NaN`
    pub fill_value: Option<f64>,
}

impl VariableEncoding {
    /// Annual seasonal means
    pub const SEASONAL_MEAN: VariableEncoding = VariableEncoding {
        dtype: StorageType::F32,
        deflate: Some(3),
        fill_value: Some(1e20),
    };

    /// Annual fire season day counts
    pub const FIRE_SEASON_LENGTH: VariableEncoding = VariableEncoding {
        dtype: StorageType::I16,
        deflate: None,
        fill_value: Some(32767.0),
    };

    /// Ensemble statistics of the climatological means
    pub const ENSEMBLE_STATISTICS: VariableEncoding = VariableEncoding {
        dtype: StorageType::F64,
        deflate: Some(4),
        fill_value: Some(f64::NAN),
    };
}

/// Opens a NetCDF file for reading
pub fn open(path: &Path) -> StatsResult<File> {
    debug!("Opening NetCDF file: {}", path.display());
    Ok(netcdf::open(path)?)
}

/// Looks up a variable that must exist
pub fn require_variable<'f>(file: &'f File, path: &Path, name: &str) -> StatsResult<Variable<'f>> {
    file.variable(name).ok_or_else(|| StatsError::MissingVariable {
        path: path.to_path_buf(),
        name: name.to_string(),
    })
}

pub fn dimension_names(var: &Variable) -> Vec<String> {
    var.dimensions().iter().map(|d| d.name().to_string()).collect()
}

/// True for string-typed variables, such as label coordinates
pub fn is_text(var: &Variable) -> bool {
    matches!(var.vartype(), NcVariableType::String | NcVariableType::Char)
}

pub fn global_attributes(file: &File) -> Attributes {
    collect_attributes(file.attributes())
}

pub fn variable_attributes(var: &Variable) -> Attributes {
    collect_attributes(var.attributes())
}

fn collect_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        match attr.value() {
            Ok(value) => match convert_attribute(value) {
                Some(v) => out.set(&attr.name(), v),
                None => debug!("Skipped unsupported attribute type for '{}'", attr.name()),
            },
            Err(e) => debug!("Could not read attribute '{}': {}", attr.name(), e),
        }
    }
    out
}

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let value = match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(v) => AttrValue::Texts(v),
        AttributeValue::Double(x) => AttrValue::Number(x),
        AttributeValue::Doubles(v) => AttrValue::Numbers(v),
        AttributeValue::Float(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Floats(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Int(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Ints(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Short(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Shorts(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Schar(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Uchar(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Ushort(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Uint(x) => AttrValue::Number(f64::from(x)),
        AttributeValue::Longlong(x) => AttrValue::Number(x as f64),
        AttributeValue::Ulonglong(x) => AttrValue::Number(x as f64),
        _ => return None,
    };
    Some(value)
}

/// Packing and missing-value conventions of a variable, applied on read
#[derive(Debug, Clone, Default)]
struct Unpacking {
    missing: Vec<f64>,
    scale: Option<f64>,
    offset: Option<f64>,
}

impl Unpacking {
    fn from_attributes(attrs: &Attributes) -> Self {
        let mut missing = Vec::new();
        for name in ["_FillValue", "missing_value"] {
            match attrs.get(name) {
                Some(AttrValue::Number(x)) => missing.push(*x),
                Some(AttrValue::Numbers(v)) => missing.extend(v.iter().copied()),
                _ => {}
            }
        }
        let number = |name: &str| match attrs.get(name) {
            Some(AttrValue::Number(x)) => Some(*x),
            _ => None,
        };
        Unpacking {
            missing,
            scale: number("scale_factor"),
            offset: number("add_offset"),
        }
    }

    fn apply(&self, raw: f64) -> f64 {
        if raw.is_nan() || self.missing.contains(&raw) {
            return f64::NAN;
        }
        raw * self.scale.unwrap_or(1.0) + self.offset.unwrap_or(0.0)
    }
}

/// Reads a whole variable as a labeled array
pub fn read_variable(file: &File, path: &Path, name: &str) -> StatsResult<GridVariable> {
    let var = require_variable(file, path, name)?;
    let attrs = variable_attributes(&var);
    let unpacking = Unpacking::from_attributes(&attrs);
    let mut data: ArrayD<f64> = var.get::<f64, _>(..)?;
    data.mapv_inplace(|v| unpacking.apply(v));
    GridVariable::new(name, dimension_names(&var), data, strip_encoding(attrs))
}

/// Reads rows `lat_rows` of a `(time, lat, lon)` variable
pub fn read_lat_slab(var: &Variable, lat_rows: Range<usize>) -> StatsResult<Array3<f64>> {
    let unpacking = Unpacking::from_attributes(&variable_attributes(var));
    let slab = var.get::<f64, _>((.., lat_rows, ..))?;
    let mut slab = slab.into_dimensionality::<Ix3>()?;
    slab.mapv_inplace(|v| unpacking.apply(v));
    Ok(slab)
}

/// Reads a numeric coordinate variable named after its dimension
pub fn read_numeric_coordinate(file: &File, path: &Path, name: &str) -> StatsResult<Coordinate> {
    let var = require_variable(file, path, name)?;
    let values = var.get_values::<f64, _>(..)?;
    Ok(Coordinate::numeric(name, values, strip_encoding(variable_attributes(&var))))
}

/// Reads a one-dimensional string variable
pub fn read_text_values(file: &File, path: &Path, name: &str) -> StatsResult<Vec<String>> {
    let var = require_variable(file, path, name)?;
    let len: usize = var.dimensions().iter().map(|d| d.len()).product();
    if var.dimensions().len() > 1 {
        return Err(StatsError::Dimensions {
            name: name.to_string(),
            expected: vec!["one dimension".to_string()],
            found: dimension_names(&var),
        });
    }
    (0..len).map(|i| Ok(var.get_string([i])?)).collect()
}

fn strip_encoding(mut attrs: Attributes) -> Attributes {
    for name in ENCODING_ATTRIBUTES {
        attrs.remove(name);
    }
    attrs
}

fn to_nc_attribute(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Texts(v) => AttributeValue::Strs(v.clone()),
        AttrValue::Number(x) => AttributeValue::Double(*x),
        AttrValue::Numbers(v) => AttributeValue::Doubles(v.clone()),
    }
}

/// Writes a dataset, replacing any existing file at `path`
pub fn write_dataset(ds: &GridDataset, path: &Path, encoding: &VariableEncoding) -> StatsResult<()> {
    ds.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        fs::remove_file(path)?;
    }

    debug!("Writing {} data variables to {}", ds.data_vars.len(), path.display());
    let mut file = netcdf::create(path)?;

    for (name, len) in &ds.dims {
        file.add_dimension(name, *len)?;
    }

    for coord in &ds.coords {
        write_coordinate(&mut file, coord)?;
    }

    for var in &ds.data_vars {
        write_data_variable(&mut file, var, encoding)?;
    }

    for (name, value) in ds.attrs.iter() {
        file.add_attribute(name, to_nc_attribute(value))?;
    }

    Ok(())
}

fn write_coordinate(file: &mut netcdf::FileMut, coord: &Coordinate) -> StatsResult<()> {
    let dims: Vec<&str> = coord.dim.iter().map(String::as_str).collect();
    match &coord.values {
        CoordValues::Numeric(values) => {
            let mut var = file.add_variable::<f64>(&coord.name, &dims)?;
            for (name, value) in strip_encoding(coord.attrs.clone()).iter() {
                var.put_attribute(name, to_nc_attribute(value))?;
            }
            var.put_values(values, ..)?;
        }
        CoordValues::Text(values) => {
            let mut var = file.add_string_variable(&coord.name, &dims)?;
            for (name, value) in strip_encoding(coord.attrs.clone()).iter() {
                var.put_attribute(name, to_nc_attribute(value))?;
            }
            for (i, value) in values.iter().enumerate() {
                var.put_string(value, [i])?;
            }
        }
    }
    Ok(())
}

fn write_data_variable(
    file: &mut netcdf::FileMut,
    grid_var: &GridVariable,
    encoding: &VariableEncoding,
) -> StatsResult<()> {
    let dims: Vec<&str> = grid_var.dims.iter().map(String::as_str).collect();
    let fill = encoding.fill_value;

    match encoding.dtype {
        StorageType::F32 => {
            let mut var = file.add_variable::<f32>(&grid_var.name, &dims)?;
            if let Some(level) = encoding.deflate {
                var.set_compression(level, true)?;
            }
            if let Some(fill) = fill {
                var.set_fill_value(fill as f32)?;
            }
            for (name, value) in strip_encoding(grid_var.attrs.clone()).iter() {
                var.put_attribute(name, to_nc_attribute(value))?;
            }
            let stored = grid_var
                .data
                .mapv(|x| if x.is_nan() { fill.unwrap_or(f64::NAN) as f32 } else { x as f32 });
            var.put(stored.view(), ..)?;
        }
        StorageType::F64 => {
            let mut var = file.add_variable::<f64>(&grid_var.name, &dims)?;
            if let Some(level) = encoding.deflate {
                var.set_compression(level, true)?;
            }
            if let Some(fill) = fill {
                var.set_fill_value(fill)?;
            }
            for (name, value) in strip_encoding(grid_var.attrs.clone()).iter() {
                var.put_attribute(name, to_nc_attribute(value))?;
            }
            let stored = grid_var.data.mapv(|x| if x.is_nan() { fill.unwrap_or(f64::NAN) } else { x });
            var.put(stored.view(), ..)?;
        }
        StorageType::I16 => {
            let fill = fill.ok_or_else(|| {
                StatsError::Config(format!("integer variable '{}' needs a fill value", grid_var.name))
            })? as i16;
            let mut var = file.add_variable::<i16>(&grid_var.name, &dims)?;
            if let Some(level) = encoding.deflate {
                var.set_compression(level, true)?;
            }
            var.set_fill_value(fill)?;
            for (name, value) in strip_encoding(grid_var.attrs.clone()).iter() {
                var.put_attribute(name, to_nc_attribute(value))?;
            }
            let stored = grid_var
                .data
                .mapv(|x| if x.is_finite() { x.round() as i16 } else { fill });
            var.put(stored.view(), ..)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpacking_masks_fill_and_scales() {
        let attrs: Attributes = [
            ("_FillValue", AttrValue::Number(-999.0)),
            ("scale_factor", AttrValue::Number(0.5)),
            ("add_offset", AttrValue::Number(1.0)),
        ]
        .into_iter()
        .collect();
        let unpacking = Unpacking::from_attributes(&attrs);
        assert!(unpacking.apply(-999.0).is_nan());
        assert_eq!(unpacking.apply(4.0), 3.0);
    }

    #[test]
    fn test_strip_encoding_drops_only_packing_attributes() {
        let attrs: Attributes = [
            ("_FillValue", AttrValue::Number(1e20)),
            ("missing_value", AttrValue::Number(1e20)),
            ("units", AttrValue::from("")),
        ]
        .into_iter()
        .collect();
        let stripped = strip_encoding(attrs);
        assert_eq!(stripped.len(), 1);
        assert!(stripped.contains("units"));
    }
}
