//! Column statistics and mean-centering

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

/// Column-wise mean of the dataset
pub fn column_means(data: ArrayView2<f32>) -> Array1<f32> {
    let n = data.nrows().max(1) as f32;

    // One worker per column
    let means: Vec<f32> = (0..data.ncols())
        .into_par_iter()
        .map(|j| data.column(j).sum() / n)
        .collect();

    Array1::from(means)
}

/// Subtract `mean` from every row
pub fn center(data: ArrayView2<f32>, mean: ArrayView1<f32>) -> Array2<f32> {
    let mut centered = data.to_owned();

    centered
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| row -= &mean);

    centered
}

/// Per-column `(min, max)` bounds of the data
pub fn column_bounds(data: ArrayView2<f32>) -> Vec<(f32, f32)> {
    (0..data.ncols())
        .into_par_iter()
        .map(|j| {
            data.column(j).iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
        })
        .collect()
}

/// Arithmetic mean of the selected rows
pub fn mean_of_rows(data: ArrayView2<f32>, rows: &[usize]) -> Array1<f32> {
    let mut sum = Array1::<f32>::zeros(data.ncols());
    for &i in rows {
        sum += &data.row(i);
    }
    if !rows.is_empty() {
        sum /= rows.len() as f32;
    }
    sum
}
