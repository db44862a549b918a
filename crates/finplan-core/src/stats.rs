//! Descriptive statistics over f64 samples, shared by the Monte Carlo
//! aggregation path. Population variance (divisor N) throughout; the tests
//! fix that choice.

use crate::error::PlanningError;
use crate::PlanResult;

/// Arithmetic mean. Empty input returns 0.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of the sample. Empty input returns 0.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation (divisor N). Empty input returns 0.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile with linear interpolation between adjacent ranks.
/// p = 0 returns the minimum, p = 100 the maximum. Empty input returns 0.
pub fn percentile(values: &[f64], p: f64) -> PlanResult<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(PlanningError::InvalidInput {
            field: "percentile".into(),
            reason: format!("must be in [0, 100], got {p}"),
        });
    }
    if values.is_empty() {
        return Ok(0.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(percentile_sorted(&sorted, p))
}

/// Percentile from an already-sorted slice.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Pearson correlation coefficient over equal-length vectors.
/// Returns 0 when either vector has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> PlanResult<f64> {
    if x.len() != y.len() {
        return Err(PlanningError::InvalidInput {
            field: "series".into(),
            reason: format!("length mismatch: {} vs {}", x.len(), y.len()),
        });
    }
    if x.is_empty() {
        return Ok(0.0);
    }
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        cov += (xi - mx) * (yi - my);
        var_x += (xi - mx).powi(2);
        var_y += (yi - my).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Ok(0.0);
    }
    Ok(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_median_basic() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(mean(&v), 3.0);
        assert_eq!(median(&v), 3.0);
    }

    #[test]
    fn test_median_even_count() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&v), 2.5);
    }

    #[test]
    fn test_empty_inputs_return_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(percentile(&[], 50.0).unwrap(), 0.0);
    }

    #[test]
    fn test_std_dev_population_divisor() {
        // Population std dev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_endpoints() {
        let v = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&v, 0.0).unwrap(), 10.0);
        assert_eq!(percentile(&v, 100.0).unwrap(), 40.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [10.0, 20.0, 30.0, 40.0];
        // rank = 0.5 * 3 = 1.5 => halfway between 20 and 30
        assert!((percentile(&v, 50.0).unwrap() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_rejects_out_of_range() {
        assert!(percentile(&[1.0], -0.1).is_err());
        assert!(percentile(&[1.0], 100.1).is_err());
    }

    #[test]
    fn test_correlation_perfect_positive_and_negative() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson_correlation(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        let z = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson_correlation(&x, &z).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_correlation_zero_variance_returns_zero() {
        let x = [5.0, 5.0, 5.0];
        let y = [1.0, 2.0, 3.0];
        assert_eq!(pearson_correlation(&x, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_correlation_length_mismatch_rejected() {
        assert!(pearson_correlation(&[1.0, 2.0], &[1.0]).is_err());
    }
}
