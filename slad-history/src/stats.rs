//! Statistics of weighted samples, such as the effective sample size, the
//! weighted mean and the credible intervals of a posterior distribution.
use anyhow::{ensure, Context};
use std::cmp::Ordering;

pub fn effective_sample_size(weights: &[f64]) -> f64 {
    //! Kish's effective sample size `(Σw)² / Σw²`, invariant to the
    //! normalisation of the weights.
    //! Returns 0 when there are no weights or they are all zero.
    let sum: f64 = weights.iter().sum();
    let sum_squares: f64 = weights.iter().map(|w| w * w).sum();
    if sum_squares == 0. {
        0.
    } else {
        sum * sum / sum_squares
    }
}

pub fn normalize(weights: &[f64]) -> anyhow::Result<Vec<f64>> {
    //! Scale the weights such that they sum to one.
    ensure!(
        weights.iter().all(|w| w.is_finite() && *w >= 0.),
        "Found negative or non finite weights"
    );
    let sum: f64 = weights.iter().sum();
    ensure!(sum > 0., "Cannot normalize weights summing to {}", sum);
    Ok(weights.iter().map(|w| w / sum).collect())
}

fn check_lengths(values: &[f64], weights: &[f64]) -> anyhow::Result<()> {
    ensure!(!values.is_empty(), "Found empty sample");
    ensure!(
        values.len() == weights.len(),
        "Found {} values but {} weights",
        values.len(),
        weights.len()
    );
    Ok(())
}

pub fn weighted_mean(values: &[f64], weights: &[f64]) -> anyhow::Result<f64> {
    check_lengths(values, weights)?;
    let weights = normalize(weights)?;
    Ok(values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum())
}

pub fn weighted_rmse(
    values: &[f64],
    weights: &[f64],
    reference: f64,
) -> anyhow::Result<f64> {
    //! Root mean squared error of the weighted sample with respect to the
    //! `reference` value, e.g. the ground-truth parameter.
    check_lengths(values, weights)?;
    let weights = normalize(weights)?;
    Ok(values
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| w * (v - reference).powi(2))
        .sum::<f64>()
        .sqrt())
}

pub fn weighted_quantile(
    values: &[f64],
    weights: &[f64],
    alpha: f64,
) -> anyhow::Result<f64> {
    //! The `alpha` quantile of the weighted sample, interpolating linearly
    //! the sorted values placed at the midpoints of their cumulative weights.
    check_lengths(values, weights)?;
    ensure!((0. ..=1.).contains(&alpha), "Quantile {} not in [0, 1]", alpha);
    let weights = normalize(weights)?;

    let mut sorted: Vec<(f64, f64)> =
        values.iter().copied().zip(weights).collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut cumsum = 0.;
    let midpoints: Vec<f64> = sorted
        .iter()
        .map(|(_, w)| {
            cumsum += w;
            cumsum - 0.5 * w
        })
        .collect();

    let sorted_values: Vec<f64> = sorted.iter().map(|(v, _)| *v).collect();
    interpolate(alpha, &midpoints, &sorted_values)
        .with_context(|| format!("Cannot compute quantile {}", alpha))
}

fn interpolate(x: f64, xp: &[f64], fp: &[f64]) -> anyhow::Result<f64> {
    //! Piecewise linear interpolation clamped to the first and last values.
    ensure!(!xp.is_empty() && xp.len() == fp.len(), "Cannot interpolate");
    if x <= xp[0] {
        return Ok(fp[0]);
    }
    let last = xp.len() - 1;
    if x >= xp[last] {
        return Ok(fp[last]);
    }
    let idx = xp.partition_point(|&p| p <= x);
    let (x0, x1) = (xp[idx - 1], xp[idx]);
    let (y0, y1) = (fp[idx - 1], fp[idx]);
    if x1 == x0 {
        Ok(y1)
    } else {
        Ok(y0 + (x - x0) * (y1 - y0) / (x1 - x0))
    }
}

pub fn credible_interval(
    values: &[f64],
    weights: &[f64],
    level: f64,
) -> anyhow::Result<(f64, f64)> {
    //! Central credible interval containing `level` of the posterior mass.
    ensure!((0. ..=1.).contains(&level), "Level {} not in [0, 1]", level);
    Ok((
        weighted_quantile(values, weights, (1. - level) / 2.)?,
        weighted_quantile(values, weights, (1. + level) / 2.)?,
    ))
}

pub fn mean_std(values: &[f64]) -> (f64, f64) {
    //! Mean and population standard deviation (no degrees of freedom
    //! correction). NaN for an empty slice.
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    #[derive(Clone, Debug)]
    struct PositiveWeights(Vec<f64>);

    impl Arbitrary for PositiveWeights {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut weights: Vec<f64> = Vec::<u16>::arbitrary(g)
                .into_iter()
                .map(|w| w as f64 + 1.)
                .collect();
            if weights.is_empty() {
                weights.push(1.);
            }
            PositiveWeights(weights)
        }
    }

    #[quickcheck]
    fn ess_between_one_and_n(weights: PositiveWeights) -> bool {
        let ess = effective_sample_size(&weights.0);
        ess >= 1. - 1e-9 && ess <= weights.0.len() as f64 + 1e-9
    }

    #[quickcheck]
    fn ess_scale_invariant(weights: PositiveWeights, scale: u8) -> bool {
        let scale = scale as f64 + 1.;
        let scaled: Vec<f64> = weights.0.iter().map(|w| w * scale).collect();
        (effective_sample_size(&weights.0) - effective_sample_size(&scaled))
            .abs()
            < 1e-6
    }

    #[test]
    fn ess_uniform_weights() {
        assert_eq!(effective_sample_size(&[0.25; 4]), 4.);
        assert_eq!(effective_sample_size(&[1., 0., 0.]), 1.);
        assert_eq!(effective_sample_size(&[]), 0.);
    }

    #[test]
    fn normalize_sums_to_one() {
        let w = normalize(&[1., 3.]).unwrap();
        assert_eq!(w, vec![0.25, 0.75]);
        assert!(normalize(&[0., 0.]).is_err());
        assert!(normalize(&[-1., 2.]).is_err());
    }

    #[test]
    fn weighted_mean_and_rmse() {
        let values = [1., 3.];
        let weights = [1., 3.];
        assert!((weighted_mean(&values, &weights).unwrap() - 2.5).abs() < 1e-12);
        // 0.25 * 1 + 0.75 * 1
        assert!(
            (weighted_rmse(&values, &weights, 2.).unwrap() - 1.).abs() < 1e-12
        );
        assert!(weighted_mean(&values, &[1.]).is_err());
    }

    #[test]
    fn weighted_quantile_uniform_weights() {
        let values = [3., 1., 2., 4.];
        let weights = [1.; 4];
        // midpoints at 0.125, 0.375, 0.625, 0.875
        assert_eq!(weighted_quantile(&values, &weights, 0.5).unwrap(), 2.5);
        assert_eq!(weighted_quantile(&values, &weights, 0.).unwrap(), 1.);
        assert_eq!(weighted_quantile(&values, &weights, 1.).unwrap(), 4.);
        assert_eq!(weighted_quantile(&values, &weights, 0.125).unwrap(), 1.);
        assert!(weighted_quantile(&values, &weights, 1.5).is_err());
    }

    #[quickcheck]
    fn credible_interval_is_ordered(weights: PositiveWeights, level: u8) -> bool {
        let level = level as f64 / u8::MAX as f64;
        let values: Vec<f64> =
            (0..weights.0.len()).map(|i| (i as f64).sin()).collect();
        let (lb, ub) = credible_interval(&values, &weights.0, level).unwrap();
        lb <= ub
    }

    #[test]
    fn mean_std_population() {
        let (mean, std) = mean_std(&[1., 3.]);
        assert_eq!(mean, 2.);
        assert_eq!(std, 1.);
        assert!(mean_std(&[]).0.is_nan());
    }
}
