//! # Ensemble Statistics Kernels
//!
//! Cross-realization statistics are rank based, so the whole realization
//! axis of a cell must sit in one contiguous lane before they are computed.
//! [`realization_last`] produces that layout and [`ensemble_statistics`]
//! refuses anything else with [`StatsError::LayoutViolation`].
//!
//! Quantiles use linear interpolation between closest ranks
//! (`h = (n - 1) q`), the same convention as numpy's default.

use crate::error::{StatsError, StatsResult};
use ndarray::{Array2, ArrayD, Axis, IxDyn};

pub const QUANTILES: [f64; 3] = [0.1, 0.5, 0.9];

/// Labels of the leading `ensemble_statistic` axis, in order
pub const STATISTIC_LABELS: [&str; 4] = ["quantile:0.1", "quantile:0.5", "quantile:0.9", "mean"];

/// Quantile `q` of an ascending, NaN-free slice
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * q;
            let lower = h.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let frac = h - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

/// Quantiles and mean of one cell's members.
///
/// With `skipna` missing members are ignored; without it any missing member
/// makes every statistic missing.
pub fn lane_statistics(members: &[f64], skipna: bool) -> [f64; 4] {
    let missing = [f64::NAN; 4];
    let mut values: Vec<f64> = if skipna {
        members.iter().copied().filter(|v| !v.is_nan()).collect()
    } else if members.iter().any(|v| v.is_nan()) {
        return missing;
    } else {
        members.to_vec()
    };
    if values.is_empty() {
        return missing;
    }

    values.sort_by(f64::total_cmp);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    [
        quantile_linear(&values, QUANTILES[0]),
        quantile_linear(&values, QUANTILES[1]),
        quantile_linear(&values, QUANTILES[2]),
        mean,
    ]
}

/// Moves the realization axis last, in standard (C) order
pub fn realization_last(data: ArrayD<f64>, realization_axis: usize) -> ArrayD<f64> {
    let ndim = data.ndim();
    let mut order: Vec<usize> = (0..ndim).filter(|&a| a != realization_axis).collect();
    order.push(realization_axis);
    data.permuted_axes(IxDyn(&order)).as_standard_layout().into_owned()
}

/// Reduces the last (realization) axis to the four ensemble statistics.
///
/// The result has a new leading axis indexed like [`STATISTIC_LABELS`]
/// followed by the input's remaining axes.
pub fn ensemble_statistics(data: &ArrayD<f64>, skipna: bool) -> StatsResult<ArrayD<f64>> {
    let shape = data.shape();
    let n_members = *shape
        .last()
        .ok_or_else(|| StatsError::LayoutViolation("cannot reduce a zero-dimensional array".to_string()))?;
    let flat = data.as_slice().ok_or_else(|| {
        StatsError::LayoutViolation(
            "realization axis is split across non-contiguous memory; move it last in standard order first"
                .to_string(),
        )
    })?;
    if n_members == 0 {
        return Err(StatsError::LayoutViolation("realization axis is empty".to_string()));
    }

    let n_cells = flat.len() / n_members;
    let mut out = Array2::<f64>::from_elem((STATISTIC_LABELS.len(), n_cells), f64::NAN);
    for (cell, lane) in flat.chunks_exact(n_members).enumerate() {
        for (k, value) in lane_statistics(lane, skipna).into_iter().enumerate() {
            out[[k, cell]] = value;
        }
    }

    let mut out_shape = vec![STATISTIC_LABELS.len()];
    out_shape.extend_from_slice(&shape[..shape.len() - 1]);
    Ok(out.into_shape_with_order(IxDyn(&out_shape))?)
}

fn against_reference(
    data: &ArrayD<f64>,
    period_axis: usize,
    reference: usize,
    op: impl Fn(f64, f64) -> f64,
) -> ArrayD<f64> {
    let reference_values = data.index_axis(Axis(period_axis), reference).to_owned();
    let mut out = data.clone();
    for mut period in out.axis_iter_mut(Axis(period_axis)) {
        period.zip_mut_with(&reference_values, |x, &r| *x = op(*x, r));
    }
    out
}

/// `x - reference` for every period
pub fn delta(data: &ArrayD<f64>, period_axis: usize, reference: usize) -> ArrayD<f64> {
    against_reference(data, period_axis, reference, |x, r| x - r)
}

/// `100 (x - reference) / reference` for every period. Division by a zero
/// reference yields `NaN`, never an infinity.
pub fn percent_delta(data: &ArrayD<f64>, period_axis: usize, reference: usize) -> ArrayD<f64> {
    against_reference(data, period_axis, reference, |x, r| {
        let pct = 100.0 * (x - r) / r;
        if pct.is_infinite() { f64::NAN } else { pct }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, array};

    #[test]
    fn test_quantiles_of_one_to_five() {
        let stats = lane_statistics(&[5.0, 1.0, 4.0, 2.0, 3.0], true);
        assert!((stats[0] - 1.4).abs() < 1e-12);
        assert_eq!(stats[1], 3.0);
        assert!((stats[2] - 4.6).abs() < 1e-12);
        assert_eq!(stats[3], 3.0);
    }

    #[test]
    fn test_skipna_controls_missing_members() {
        let lane = [1.0, f64::NAN, 3.0];
        let skipped = lane_statistics(&lane, true);
        assert_eq!(skipped[1], 2.0);
        assert_eq!(skipped[3], 2.0);
        assert!(lane_statistics(&lane, false).iter().all(|v| v.is_nan()));
        assert!(lane_statistics(&[f64::NAN, f64::NAN], true).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_ensemble_statistics_shape() {
        // (realization, period, lat) with 5 members
        let data = Array::from_shape_fn((5, 2, 3), |(r, p, l)| (r + 1) as f64 + 10.0 * p as f64 + 100.0 * l as f64)
            .into_dyn();
        let data = realization_last(data, 0);
        assert_eq!(data.shape(), &[2, 3, 5]);

        let stats = ensemble_statistics(&data, true).unwrap();
        assert_eq!(stats.shape(), &[4, 2, 3]);
        assert_eq!(stats[[1, 1, 2]], 213.0);
        assert_eq!(stats[[3, 0, 1]], 103.0);
    }

    #[test]
    fn test_non_contiguous_realization_axis_is_rejected() {
        let data = Array::<f64, _>::zeros((5, 4)).into_dyn();
        let transposed = data.reversed_axes();
        assert!(matches!(
            ensemble_statistics(&transposed, true),
            Err(StatsError::LayoutViolation(_))
        ));
    }

    #[test]
    fn test_delta_is_zero_at_reference() {
        // (period, realization)
        let data = array![[2.0, 4.0], [3.0, 8.0], [0.0, 1.0]].into_dyn();
        let d = delta(&data, 0, 0);
        assert_eq!(d.index_axis(Axis(0), 0).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0]);
        assert_eq!(d[[1, 1]], 4.0);
        assert_eq!(d[[2, 0]], -2.0);
    }

    #[test]
    fn test_percent_delta_zero_reference_is_missing() {
        // (period, realization): reference row first
        let data = array![[0.0, 0.0, 10.0], [0.0, 5.0, 15.0]].into_dyn();
        let pct = percent_delta(&data, 0, 0);
        assert!(pct[[1, 0]].is_nan());
        assert!(pct[[1, 1]].is_nan());
        assert_eq!(pct[[1, 2]], 50.0);
        assert!(pct[[0, 0]].is_nan());
        assert_eq!(pct[[0, 2]], 0.0);
    }
}
