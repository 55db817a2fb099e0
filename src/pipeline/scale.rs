//! Min-max scaling to the closed interval [0, 1]

use ndarray::{Array2, Axis};
use serde::Serialize;

/// Bounds fitted on one matrix, one pair per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalerParams {
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
}

impl ScalerParams {
    /// Whether a column had a single distinct value when fitted.
    pub fn is_constant(&self, column: usize) -> bool {
        self.maxs[column] == self.mins[column]
    }
}

/// Rescale each column with `(x - min) / (max - min)`.
///
/// Constant columns (min == max) have no range to divide by; every value in
/// such a column scales to 0. The input must already be imputed.
pub fn min_max_scale(values: &Array2<f64>) -> (Array2<f64>, ScalerParams) {
    let mut scaled = values.clone();
    let mut mins = Vec::with_capacity(values.ncols());
    let mut maxs = Vec::with_capacity(values.ncols());

    for mut column in scaled.axis_iter_mut(Axis(1)) {
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if max == min {
            column.fill(0.0);
        } else {
            let range = max - min;
            column.mapv_inplace(|x| (x - min) / range);
        }
        mins.push(min);
        maxs.push(max);
    }

    (scaled, ScalerParams { mins, maxs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_min_max_scale_normal() {
        let features = arr2(&[[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]]);
        let (scaled, params) = min_max_scale(&features);

        assert!((scaled[[0, 0]] - 0.0).abs() < 1e-10);
        assert!((scaled[[1, 0]] - 0.5).abs() < 1e-10);
        assert!((scaled[[2, 0]] - 1.0).abs() < 1e-10);

        assert!((scaled[[0, 1]] - 0.0).abs() < 1e-10);
        assert!((scaled[[1, 1]] - 0.5).abs() < 1e-10);
        assert!((scaled[[2, 1]] - 1.0).abs() < 1e-10);

        assert_eq!(params.mins, vec![0.0, 10.0]);
        assert_eq!(params.maxs, vec![10.0, 30.0]);
    }

    #[test]
    fn test_min_max_scale_constant_column() {
        let features = arr2(&[[5.0, 10.0], [5.0, 20.0], [5.0, 30.0]]);
        let (scaled, params) = min_max_scale(&features);

        for row in 0..3 {
            assert_eq!(scaled[[row, 0]], 0.0);
        }
        assert!(params.is_constant(0));
        assert!(!params.is_constant(1));
    }

    #[test]
    fn test_min_max_scale_tiny_range_is_not_constant() {
        let features = arr2(&[[0.0], [1e-17], [2e-17]]);
        let (scaled, params) = min_max_scale(&features);

        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
        assert!(!params.is_constant(0));
    }

    #[test]
    fn test_min_max_scale_negative_values() {
        let features = arr2(&[[-10.0], [0.0], [10.0]]);
        let (scaled, _) = min_max_scale(&features);
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_min_max_scale_bounds_are_exact() {
        let features = arr2(&[[0.1], [0.7], [0.3], [0.9]]);
        let (scaled, _) = min_max_scale(&features);
        let min = scaled.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }
}
