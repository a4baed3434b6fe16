//! The test problems, each a forward model with outliers corrupting its
//! observed data.
/// Conversion reaction with zeroed or swapped observations.
pub mod conversion;
/// Toy models with an uninformative statistic or gaussian errors.
pub mod gaussian;
/// The g-and-k distribution.
pub mod gk;
/// The predator-prey Markov jump process.
pub mod lotka_volterra;
/// Growth of a tumour spheroid.
pub mod tumor;

pub use conversion::{CRErrorSwapProblem, CRErrorZeroProblem};
pub use gaussian::{GaussianErrorProblem, UninfErrorProblem};
pub use gk::PrangleGKErrorProblem;
pub use lotka_volterra::PrangleLVErrorProblem;
pub use tumor::{TumorErrorProblem, TumorErrorProblemBuilder};

use anyhow::ensure;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;

use crate::problem::Parameter;

pub(crate) fn add_gaussian_noise(
    values: &mut [f64],
    sd: f64,
    rng: &mut Pcg64Mcg,
) -> anyhow::Result<()> {
    let normal = Normal::new(0., sd)?;
    for v in values.iter_mut() {
        *v += normal.sample(rng);
    }
    Ok(())
}

pub(crate) fn exp_parameters<const N: usize>(
    par: &Parameter,
    names: [&str; N],
    base: f64,
) -> anyhow::Result<[f64; N]> {
    //! Parameters sampled on log scale with `base`, converted back to linear
    //! scale.
    let mut values = [0.; N];
    for (v, name) in values.iter_mut().zip(names) {
        *v = base.powf(par.get(name)?);
        ensure!(v.is_finite(), "Found non finite parameter {}", name);
    }
    Ok(values)
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::problem::{AnyProblem, Problem};
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    pub fn check_simulation_shape(problem: &AnyProblem, seed: u64) -> bool {
        //! Simulate from the prior and check the keys and the number of values
        //! are those of the observed data.
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let par = problem.sample_prior(&mut rng);
        let data = problem.simulate(&par, &mut rng).unwrap();
        let obs = problem.get_obs().unwrap();
        data.keys() == problem.get_y_keys()
            && obs.keys() == problem.get_y_keys()
            && data.len() == obs.len()
            && problem.prior_pdf(&par) > 0.
    }

    pub fn check_obs(problem: &AnyProblem, outlier_free: &AnyProblem) {
        //! The observed data is reproducible and differs from the outlier-free
        //! data exactly at the outliers.
        let corrupted = problem.get_obs_with_outliers().unwrap();
        assert_eq!(corrupted, problem.get_obs_with_outliers().unwrap());
        let free = outlier_free.get_obs_with_outliers().unwrap();
        assert!(free.outliers.is_empty());
        assert!(!corrupted.outliers.is_empty());
        let mut changed = Vec::new();
        for key in problem.get_y_keys() {
            let (c, f) =
                (corrupted.data.get(&key).unwrap(), free.data.get(&key).unwrap());
            for (idx, (vc, vf)) in c.iter().zip(f.iter()).enumerate() {
                if vc != vf {
                    changed.push((key.clone(), idx));
                }
            }
        }
        changed.sort();
        assert_eq!(changed, corrupted.outliers);
    }
}
