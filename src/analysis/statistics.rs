//! NaN-aware summary statistics
//!
//! Missing values are carried as NaN and skipped, never zero-filled.

/// Mean of the finite values; NaN if there are none
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sample standard deviation (n - 1 denominator) of the finite values
///
/// NaN for fewer than two values.
pub fn nan_std(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return f64::NAN;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let variance =
        finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    variance.sqrt()
}

/// Differences between consecutive values; NaN wherever either side is NaN
pub fn consecutive_diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// `part / whole × 100`, NaN when `whole` is 0
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        f64::NAN
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_mean_skips_missing() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[]).is_nan());
        assert!(nan_mean(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_nan_std_sample_estimator() {
        // values 2, 4, 4, 4, 5, 5, 7, 9: sample variance 32/7
        let sd = nan_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0, f64::NAN]);
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(nan_std(&[10.0]).is_nan());
        assert!(nan_std(&[10.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_consecutive_diffs_propagate_nan() {
        let diffs = consecutive_diffs(&[0.0, 500.0, f64::NAN, 1500.0]);
        assert_eq!(diffs[0], 500.0);
        assert!(diffs[1].is_nan());
        assert!(diffs[2].is_nan());
        assert!(consecutive_diffs(&[1.0]).is_empty());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert!(percent(0, 0).is_nan());
    }
}
