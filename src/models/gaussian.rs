use rand_distr::{Distribution, StandardNormal};
use rand_pcg::Pcg64Mcg;

use crate::models::add_gaussian_noise;
use crate::outlier::{ErrorKind, ErrorModel};
use crate::problem::{Parameter, Prior, Problem, ProblemType, SumStats};

/// A parameter `p0` observed with small noise in `y`, and pure noise
/// independent of the parameter in `y_uninf`. Outliers are added to `y`
/// only.
#[derive(Debug, Clone, PartialEq)]
pub struct UninfErrorProblem {
    pub n_obs_error: usize,
}

impl UninfErrorProblem {
    pub const N_Y: usize = 4;
    pub const N_Y_UNINF: usize = 6;
    pub const NOISE: f64 = 0.1;
    pub const OFFSET: f64 = 4.;

    pub fn new(n_obs_error: usize) -> Self {
        UninfErrorProblem { n_obs_error }
    }
}

impl Default for UninfErrorProblem {
    fn default() -> Self {
        UninfErrorProblem::new(1)
    }
}

impl Problem for UninfErrorProblem {
    fn name(&self) -> ProblemType {
        ProblemType::Uninf
    }

    fn get_prior_bounds(&self) -> Prior {
        Prior::new(&[("p0", 0., 10.)])
    }

    fn get_gt_par(&self) -> Parameter {
        Parameter::from([("p0", 5.)])
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec!["y".to_string(), "y_uninf".to_string()]
    }

    fn get_id(&self) -> String {
        format!("uninf_{}", self.n_obs_error)
    }

    fn error_model(&self) -> ErrorModel {
        ErrorModel::on_keys(
            ErrorKind::Offset { n: self.n_obs_error, offset: Self::OFFSET },
            &["y"],
        )
    }

    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats> {
        let p0 = par.get("p0")?;
        let mut y = vec![p0; Self::N_Y];
        add_gaussian_noise(&mut y, Self::NOISE, rng)?;
        let y_uninf: Vec<f64> = StandardNormal
            .sample_iter(&mut *rng)
            .take(Self::N_Y_UNINF)
            .collect();

        let mut data = SumStats::default();
        data.insert("y", y);
        data.insert("y_uninf", y_uninf);
        Ok(data)
    }
}

/// Replicates of a gaussian with unknown mean `p0`, some of them corrupted by
/// a much wider gaussian noise.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianErrorProblem {
    pub n_obs_error: usize,
}

impl GaussianErrorProblem {
    pub const N_Y: usize = 10;
    pub const ERROR_SD: f64 = 10.;

    pub fn new(n_obs_error: usize) -> Self {
        GaussianErrorProblem { n_obs_error }
    }
}

impl Default for GaussianErrorProblem {
    fn default() -> Self {
        GaussianErrorProblem::new(2)
    }
}

impl Problem for GaussianErrorProblem {
    fn name(&self) -> ProblemType {
        ProblemType::Gaussian
    }

    fn get_prior_bounds(&self) -> Prior {
        Prior::new(&[("p0", 0., 10.)])
    }

    fn get_gt_par(&self) -> Parameter {
        Parameter::from([("p0", 5.)])
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec!["y".to_string()]
    }

    fn get_id(&self) -> String {
        format!("gaussian_{}", self.n_obs_error)
    }

    fn error_model(&self) -> ErrorModel {
        ErrorModel::new(ErrorKind::Gaussian {
            n: self.n_obs_error,
            sd: Self::ERROR_SD,
        })
    }

    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats> {
        let mut y = vec![par.get("p0")?; Self::N_Y];
        add_gaussian_noise(&mut y, 1., rng)?;
        let mut data = SumStats::default();
        data.insert("y", y);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_util::{check_obs, check_simulation_shape};
    use rand::SeedableRng;

    #[quickcheck]
    fn uninf_simulation_shape(seed: u64) -> bool {
        check_simulation_shape(&UninfErrorProblem::default().into(), seed)
    }

    #[quickcheck]
    fn gaussian_simulation_shape(seed: u64) -> bool {
        check_simulation_shape(&GaussianErrorProblem::default().into(), seed)
    }

    #[test]
    fn uninf_outliers_only_in_y() {
        let problem = UninfErrorProblem::new(3);
        let corrupted = problem.get_obs_with_outliers().unwrap();
        assert_eq!(corrupted.outliers.len(), 3);
        assert!(corrupted.outliers.iter().all(|(key, _)| key == "y"));
        check_obs(&problem.into(), &UninfErrorProblem::new(0).into());
    }

    #[test]
    fn uninf_obs_close_to_ground_truth() {
        let obs = UninfErrorProblem::new(0).get_obs().unwrap();
        assert!(obs.get("y").unwrap().iter().all(|y| (y - 5.).abs() < 1.));
        assert_eq!(obs.get("y_uninf").unwrap().len(), 6);
    }

    #[test]
    fn gaussian_obs() {
        check_obs(
            &GaussianErrorProblem::default().into(),
            &GaussianErrorProblem::new(0).into(),
        );
        assert_eq!(GaussianErrorProblem::default().get_id(), "gaussian_2");
    }

    #[test]
    fn gaussian_mean_follows_parameter() {
        let problem = GaussianErrorProblem::new(0);
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let par = Parameter::from([("p0", 8.)]);
        let mean = (0..200)
            .flat_map(|_| problem.simulate(&par, &mut rng).unwrap().flatten())
            .sum::<f64>()
            / 2000.;
        assert!((mean - 8.).abs() < 0.2);
    }
}
