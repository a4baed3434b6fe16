use anyhow::ensure;
use rand_distr::{Distribution, StandardNormal};
use rand_pcg::Pcg64Mcg;

use crate::outlier::{ErrorKind, ErrorModel};
use crate::problem::{Parameter, Prior, Problem, ProblemType, SumStats};

/// The g-and-k distribution summarised by the order statistics of a large
/// sample at its octiles, see Prangle 2017.
#[derive(Debug, Clone, PartialEq)]
pub struct PrangleGKErrorProblem {
    pub n_obs_error: usize,
}

impl PrangleGKErrorProblem {
    pub const N_SAMPLES: usize = 1000;
    pub const N_OCTILES: usize = 7;
    pub const C: f64 = 0.8;
    pub const OFFSET: f64 = 10.;

    pub fn new(n_obs_error: usize) -> Self {
        PrangleGKErrorProblem { n_obs_error }
    }
}

impl Default for PrangleGKErrorProblem {
    fn default() -> Self {
        PrangleGKErrorProblem::new(1)
    }
}

pub fn gk_quantile(z: f64, a: f64, b: f64, g: f64, k: f64) -> f64 {
    //! Quantile function of the g-and-k distribution evaluated at the
    //! standard normal quantile `z`.
    a + b
        * (1. + PrangleGKErrorProblem::C * (g * z / 2.).tanh())
        * (1. + z * z).powf(k)
        * z
}

pub fn octiles(sample: &mut [f64]) -> anyhow::Result<Vec<f64>> {
    //! The order statistics of `sample` at the octiles `i n / 8`, sorting
    //! the sample in place.
    ensure!(sample.len() >= 8, "Found sample too small to compute octiles");
    ensure!(sample.iter().all(|v| !v.is_nan()), "Found NaN in the sample");
    sample.sort_by(|a, b| a.total_cmp(b));
    Ok((1..=PrangleGKErrorProblem::N_OCTILES)
        .map(|i| sample[i * sample.len() / 8])
        .collect())
}

impl Problem for PrangleGKErrorProblem {
    fn name(&self) -> ProblemType {
        ProblemType::Gk
    }

    fn get_prior_bounds(&self) -> Prior {
        Prior::new(&[("A", 0., 10.), ("B", 0., 10.), ("g", 0., 10.), ("k", 0., 10.)])
    }

    fn get_gt_par(&self) -> Parameter {
        Parameter::from([("A", 3.), ("B", 1.), ("g", 1.5), ("k", 0.5)])
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec!["y".to_string()]
    }

    fn get_id(&self) -> String {
        format!("gk_{}", self.n_obs_error)
    }

    fn error_model(&self) -> ErrorModel {
        ErrorModel::new(ErrorKind::Offset {
            n: self.n_obs_error,
            offset: Self::OFFSET,
        })
    }

    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats> {
        let (a, b, g, k) =
            (par.get("A")?, par.get("B")?, par.get("g")?, par.get("k")?);
        let mut sample: Vec<f64> = StandardNormal
            .sample_iter(&mut *rng)
            .take(Self::N_SAMPLES)
            .map(|z: f64| gk_quantile(z, a, b, g, k))
            .collect();
        let mut data = SumStats::default();
        data.insert("y", octiles(&mut sample)?);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_util::{check_obs, check_simulation_shape};

    #[quickcheck]
    fn gk_simulation_shape(seed: u64) -> bool {
        check_simulation_shape(&PrangleGKErrorProblem::default().into(), seed)
    }

    #[quickcheck]
    fn quantile_increasing(z: i8, a: u8, b: u8) -> bool {
        // monotone for B > 0, k >= 0 and |g| small enough with c = 0.8
        let (a, b) = (a as f64 / 10., b as f64 / 10. + 0.1);
        let z = z as f64 / 50.;
        gk_quantile(z, a, b, 1.5, 0.5) < gk_quantile(z + 0.01, a, b, 1.5, 0.5)
    }

    #[test]
    fn quantile_at_median_is_a() {
        assert_eq!(gk_quantile(0., 3., 1., 1.5, 0.5), 3.);
    }

    #[test]
    fn octiles_of_ordered_sample() {
        let mut sample: Vec<f64> = (0..16).rev().map(|i| i as f64).collect();
        assert_eq!(
            octiles(&mut sample).unwrap(),
            vec![2., 4., 6., 8., 10., 12., 14.]
        );
        assert!(octiles(&mut [1., 2.]).is_err());
    }

    #[test]
    fn obs_median_close_to_a() {
        let obs = PrangleGKErrorProblem::new(0).get_obs().unwrap();
        let y = obs.get("y").unwrap();
        assert_eq!(y.len(), 7);
        assert!(y.windows(2).all(|w| w[0] <= w[1]));
        assert!((y[3] - 3.).abs() < 0.5);
        check_obs(
            &PrangleGKErrorProblem::default().into(),
            &PrangleGKErrorProblem::new(0).into(),
        );
    }
}
