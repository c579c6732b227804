//! Domain mask: a static `(lat, lon)` grid where cells equal to the include
//! value are kept and everything else is set to `NaN`.

use crate::error::{StatsError, StatsResult};
use crate::grid::{GridDataset, GridVariable};
use crate::netcdf_io;
use log::{debug, info};
use ndarray::{Array2, Ix2};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DomainMask {
    included: Array2<bool>,
}

impl DomainMask {
    /// Loads the mask variable from a NetCDF file
    pub fn load(path: &Path, variable: &str, include_value: f64) -> StatsResult<Self> {
        info!("Loading domain mask '{}' from {}", variable, path.display());
        let file = netcdf_io::open(path)?;
        let var = netcdf_io::read_variable(&file, path, variable)?;
        let mask = Self::from_variable(&var, include_value)?;
        debug!("Domain mask keeps {} of {} cells", mask.included_cells(), mask.included.len());
        Ok(mask)
    }

    /// Builds the mask from a `(lat, lon)` or `(lon, lat)` variable
    pub fn from_variable(var: &GridVariable, include_value: f64) -> StatsResult<Self> {
        let lat = match (var.axis_of("lat"), var.axis_of("lon")) {
            (Some(lat), Some(_)) if var.dims.len() == 2 => lat,
            _ => {
                return Err(StatsError::Dimensions {
                    name: var.name.clone(),
                    expected: vec!["lat".to_string(), "lon".to_string()],
                    found: var.dims.clone(),
                });
            }
        };
        let values = var.data.view().into_dimensionality::<Ix2>()?;
        let values = if lat == 0 { values } else { values.reversed_axes() };
        let included = values.mapv(|v| v == include_value);
        Ok(DomainMask { included })
    }

    pub fn included_cells(&self) -> usize {
        self.included.iter().filter(|&&kept| kept).count()
    }

    /// Sets every excluded cell of a variable with `lat` and `lon` axes to `NaN`
    pub fn apply(&self, var: &mut GridVariable) -> StatsResult<()> {
        let (lat, lon) = match (var.axis_of("lat"), var.axis_of("lon")) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(StatsError::Dimensions {
                    name: var.name.clone(),
                    expected: vec!["lat".to_string(), "lon".to_string()],
                    found: var.dims.clone(),
                });
            }
        };
        let shape = var.data.shape();
        if (shape[lat], shape[lon]) != self.included.dim() {
            return Err(StatsError::Dimensions {
                name: var.name.clone(),
                expected: vec![self.included.nrows().to_string(), self.included.ncols().to_string()],
                found: vec![shape[lat].to_string(), shape[lon].to_string()],
            });
        }

        for (idx, value) in var.data.indexed_iter_mut() {
            if !self.included[[idx[lat], idx[lon]]] {
                *value = f64::NAN;
            }
        }
        Ok(())
    }

    /// Applies the mask to every data variable of a dataset that lies on
    /// the grid. Variables without both `lat` and `lon` are left untouched.
    pub fn apply_all(&self, ds: &mut GridDataset) -> StatsResult<()> {
        for var in ds.data_vars.iter_mut() {
            if var.axis_of("lat").is_none() || var.axis_of("lon").is_none() {
                debug!("Not masking '{}', it has no lat/lon axes", var.name);
                continue;
            }
            self.apply(var)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Attributes;
    use ndarray::{ArrayD, IxDyn, array};

    #[test]
    fn test_only_include_value_survives() {
        let raw = GridVariable::new(
            "CanLEAD_FWI_mask",
            vec!["lat".into(), "lon".into()],
            array![[100.0, 0.0], [f64::NAN, 100.0]].into_dyn(),
            Attributes::new(),
        )
        .unwrap();
        let mask = DomainMask::from_variable(&raw, 100.0).unwrap();
        assert_eq!(mask.included_cells(), 2);

        let data = ArrayD::from_elem(IxDyn(&[1, 3, 2, 2]), 7.0);
        let mut var = GridVariable::new(
            "fire_season",
            vec!["realization".into(), "time".into(), "lat".into(), "lon".into()],
            data,
            Attributes::new(),
        )
        .unwrap();
        mask.apply(&mut var).unwrap();
        for t in 0..3 {
            assert_eq!(var.data[[0, t, 0, 0]], 7.0);
            assert!(var.data[[0, t, 0, 1]].is_nan());
            assert!(var.data[[0, t, 1, 0]].is_nan());
            assert_eq!(var.data[[0, t, 1, 1]], 7.0);
        }
    }

    #[test]
    fn test_lon_lat_order_is_transposed() {
        let raw = GridVariable::new(
            "mask",
            vec!["lon".into(), "lat".into()],
            array![[100.0, 100.0, 0.0], [0.0, 0.0, 0.0]].into_dyn(),
            Attributes::new(),
        )
        .unwrap();
        let mask = DomainMask::from_variable(&raw, 100.0).unwrap();
        assert_eq!(mask.included.dim(), (3, 2));
        assert!(mask.included[[1, 0]]);
        assert!(!mask.included[[2, 0]]);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let mask = DomainMask {
            included: Array2::from_elem((2, 2), true),
        };
        let mut var = GridVariable::new(
            "x",
            vec!["lat".into(), "lon".into()],
            ArrayD::zeros(IxDyn(&[3, 2])),
            Attributes::new(),
        )
        .unwrap();
        assert!(mask.apply(&mut var).is_err());
    }

    #[test]
    fn test_apply_all_skips_variables_off_the_grid() {
        let mask = DomainMask {
            included: array![[true, false]],
        };
        let on_grid = GridVariable::new(
            "FWI",
            vec!["period".into(), "lat".into(), "lon".into()],
            ArrayD::from_elem(IxDyn(&[2, 1, 2]), 1.0),
            Attributes::new(),
        )
        .unwrap();
        let per_period = GridVariable::new(
            "area_mean",
            vec!["period".into()],
            array![3.0, 4.0].into_dyn(),
            Attributes::new(),
        )
        .unwrap();
        let mut ds = GridDataset {
            dims: vec![("period".into(), 2), ("lat".into(), 1), ("lon".into(), 2)],
            data_vars: vec![on_grid, per_period.clone()],
            ..Default::default()
        };

        mask.apply_all(&mut ds).unwrap();
        let fwi = ds.data_var("FWI").unwrap();
        assert_eq!(fwi.data[[1, 0, 0]], 1.0);
        assert!(fwi.data[[1, 0, 1]].is_nan());
        assert_eq!(ds.data_var("area_mean").unwrap().data, per_period.data);

        let mut lone = per_period;
        assert!(mask.apply(&mut lone).is_err());
    }
}
