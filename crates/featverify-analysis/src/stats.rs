use itertools_num::linspace;
use ndarray::{Array1, Array2, ArrayView1};
use statrs::statistics::Statistics;

/// Mean and population standard deviation of a list of values.
///
/// Returns `(NaN, NaN)` for an empty slice.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().mean();
    let std = if values.len() > 1 {
        values.iter().population_std_dev()
    } else {
        0.0
    };
    (mean, std)
}

/// Format a mean and standard deviation as `"0.812 ± 0.034"`.
pub fn format_mean_std(mean: f64, std: f64) -> String {
    format!("{:.3} ± {:.3}", mean, std)
}

/// Percentile `q` (0..=100) of the non-NaN values using linear interpolation
/// between closest ranks, the default method of most numeric libraries.
///
/// Returns `NaN` if there are no finite values.
pub fn nan_percentile(values: ArrayView1<'_, f64>, q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mean of the non-NaN values, `NaN` if there are none.
pub fn nan_mean(values: ArrayView1<'_, f64>) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        f64::NAN
    } else {
        finite.iter().mean()
    }
}

/// Pearson correlation of two columns over the rows where both are present.
///
/// Returns `NaN` when fewer than two complete pairs exist or either column
/// is constant over those pairs.
pub fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Pairwise Pearson correlation matrix of the columns of `x`.
pub fn pearson_matrix(x: &Array2<f64>) -> Array2<f64> {
    let n = x.ncols();
    let mut out = Array2::<f64>::eye(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let r = pearson(x.column(i), x.column(j));
            out[(i, j)] = r;
            out[(j, i)] = r;
        }
    }
    out
}

/// `n` evenly spaced points over `[start, end]`.
pub fn grid(start: f64, end: f64, n: usize) -> Array1<f64> {
    linspace(start, end, n).collect()
}

/// One-dimensional piecewise-linear interpolation.
///
/// `xp` must be non-decreasing. Points left of `xp[0]` take `fp[0]`, points
/// right of the last knot take the last value. Where `xp` repeats a value,
/// the last of the repeated knots is used, so a vertical step resolves to
/// its upper end.
pub fn interp(x: &Array1<f64>, xp: &[f64], fp: &[f64]) -> Array1<f64> {
    assert_eq!(xp.len(), fp.len(), "interp knots and values must have equal lengths");
    assert!(!xp.is_empty(), "interp requires at least one knot");
    let last = xp.len() - 1;

    x.mapv(|xi| {
        if xi.is_nan() {
            return f64::NAN;
        }
        if xi < xp[0] {
            return fp[0];
        }
        // last knot with xp[j] <= xi
        let j = xp.partition_point(|&v| v <= xi) - 1;
        if j >= last {
            return fp[last];
        }
        let (x0, x1) = (xp[j], xp[j + 1]);
        let (y0, y1) = (fp[j], fp[j + 1]);
        y0 + (y1 - y0) * (xi - x0) / (x1 - x0)
    })
}

/// Area under a curve by the trapezoidal rule. `x` must be monotonic.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}
