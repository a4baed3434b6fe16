use rand_pcg::Pcg64Mcg;
use slad_sim::process::{simulate, LotkaVolterra};
use slad_sim::NbIndividuals;

use crate::models::{add_gaussian_noise, exp_parameters};
use crate::outlier::{ErrorKind, ErrorModel};
use crate::problem::{Parameter, Prior, Problem, ProblemType, SumStats};

/// The stochastic Lotka-Volterra predator-prey process, observed with
/// gaussian noise, see Prangle 2017.
#[derive(Debug, Clone, PartialEq)]
pub struct PrangleLVErrorProblem {
    pub n_obs_error: usize,
}

impl PrangleLVErrorProblem {
    /// Initial number of `[prey, predator]`
    pub const INITIAL_STATE: [NbIndividuals; 2] = [50, 100];
    /// Simulations with more reactions are stopped, keeping the last state
    pub const MAX_REACTIONS: usize = 100_000;
    pub const NOISE: f64 = 5.;
    pub const OFFSET: f64 = 50.;

    pub fn new(n_obs_error: usize) -> Self {
        PrangleLVErrorProblem { n_obs_error }
    }

    pub fn timepoints() -> Vec<f64> {
        (1..=16).map(|i| 2. * i as f64).collect()
    }
}

impl Default for PrangleLVErrorProblem {
    fn default() -> Self {
        PrangleLVErrorProblem::new(3)
    }
}

impl Problem for PrangleLVErrorProblem {
    fn name(&self) -> ProblemType {
        ProblemType::Lv
    }

    fn get_prior_bounds(&self) -> Prior {
        Prior::new(&[("p1", -6., 2.), ("p2", -6., 2.), ("p3", -6., 2.)])
    }

    fn get_gt_par(&self) -> Parameter {
        Parameter::from([
            ("p1", 1f64.ln()),
            ("p2", 0.005f64.ln()),
            ("p3", 0.6f64.ln()),
        ])
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec!["predator".to_string(), "prey".to_string()]
    }

    fn get_id(&self) -> String {
        format!("lv_{}", self.n_obs_error)
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
        let [prey_birth, predation, predator_death] =
            exp_parameters(par, ["p1", "p2", "p3"], std::f64::consts::E)?;
        let lv = LotkaVolterra { prey_birth, predation, predator_death };
        let trajectory = simulate::<_, 2, 3>(
            &lv,
            Self::INITIAL_STATE,
            &Self::timepoints(),
            Self::MAX_REACTIONS,
            rng,
        )?;

        let mut prey: Vec<f64> =
            trajectory.species(0).into_iter().map(|x| x as f64).collect();
        let mut predator: Vec<f64> =
            trajectory.species(1).into_iter().map(|y| y as f64).collect();
        add_gaussian_noise(&mut prey, Self::NOISE, rng)?;
        add_gaussian_noise(&mut predator, Self::NOISE, rng)?;

        let mut data = SumStats::default();
        data.insert("prey", prey);
        data.insert("predator", predator);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_util::{check_obs, check_simulation_shape};

    #[quickcheck]
    fn lv_simulation_shape(seed: u64) -> bool {
        check_simulation_shape(&PrangleLVErrorProblem::default().into(), seed)
    }

    #[test]
    fn obs_has_16_timepoints_per_species() {
        let obs = PrangleLVErrorProblem::new(0).get_obs().unwrap();
        assert_eq!(obs.get("prey").unwrap().len(), 16);
        assert_eq!(obs.get("predator").unwrap().len(), 16);
        check_obs(
            &PrangleLVErrorProblem::default().into(),
            &PrangleLVErrorProblem::new(0).into(),
        );
    }

    #[test]
    fn ground_truth_on_log_scale() {
        let gt = PrangleLVErrorProblem::default().get_gt_par();
        assert_eq!(gt.get("p1").unwrap(), 0.);
        assert!((gt.get("p2").unwrap().exp() - 0.005).abs() < 1e-12);
        assert!(gt.get("p4").is_err());
    }
}
