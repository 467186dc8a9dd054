//! Detection of logarithmically spaced bin edges.

/// Largest absolute deviation from a log10 grid still accepted as logarithmic.
pub const DEFAULT_LOG_TOLERANCE: f64 = 1e-5;

/// `n` values evenly spaced in log10 between `10^lo_exp` and `10^hi_exp`.
///
/// The endpoints are exactly `10^lo_exp` and `10^hi_exp`.
pub fn logspace(lo_exp: f64, hi_exp: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(lo_exp)],
        _ => {
            let step = (hi_exp - lo_exp) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let exp = if i == n - 1 { hi_exp } else { lo_exp + step * i as f64 };
                    10f64.powf(exp)
                })
                .collect()
        }
    }
}

/// Whether `edges` are evenly spaced in log10, within [`DEFAULT_LOG_TOLERANCE`].
pub fn is_logarithmic(edges: &[f64]) -> bool {
    is_logarithmic_within(edges, DEFAULT_LOG_TOLERANCE)
}

/// Whether every edge lies strictly within `tolerance` of the log10 grid
/// spanning the first and last edge.
///
/// Fewer than two edges, or any edge where log10 is undefined (zero,
/// negative, non-finite), is never logarithmic.
pub fn is_logarithmic_within(edges: &[f64], tolerance: f64) -> bool {
    let (Some(&first), Some(&last)) = (edges.first(), edges.last()) else {
        return false;
    };
    if edges.len() < 2 || edges.iter().any(|&e| !(e.is_finite() && e > 0.0)) {
        return false;
    }

    let reference = logspace(first.log10(), last.log10(), edges.len());
    let max_dev = edges.iter().zip(&reference).map(|(e, r)| (e - r).abs()).fold(0.0, f64::max);
    max_dev < tolerance
}
