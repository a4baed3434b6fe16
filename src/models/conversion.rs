use rand_pcg::Pcg64Mcg;

use crate::models::{add_gaussian_noise, exp_parameters};
use crate::outlier::{ErrorKind, ErrorModel};
use crate::problem::{Parameter, Prior, Problem, ProblemType, SumStats};

pub const N_TIMEPOINTS: usize = 10;
pub const MAX_TIME: f64 = 30.;
pub const NOISE: f64 = 0.02;

pub fn timepoints() -> Vec<f64> {
    //! Equidistant observation times in `[0, MAX_TIME]`.
    (0..N_TIMEPOINTS)
        .map(|i| MAX_TIME * i as f64 / (N_TIMEPOINTS - 1) as f64)
        .collect()
}

pub fn x2(t: f64, k1: f64, k2: f64) -> f64 {
    //! Concentration of the second species of the reversible reaction
    //! `x1 <-> x2` with rates `k1` and `k2`, starting from `x1 = 1, x2 = 0`.
    k1 / (k1 + k2) * (1. - (-(k1 + k2) * t).exp())
}

fn prior() -> Prior {
    Prior::new(&[("p0", -7., 1.), ("p1", -7., 1.)])
}

fn gt_par() -> Parameter {
    Parameter::from([("p0", -2.5), ("p1", -2.)])
}

fn simulate_conversion(
    par: &Parameter,
    rng: &mut Pcg64Mcg,
) -> anyhow::Result<SumStats> {
    let [k1, k2] = exp_parameters(par, ["p0", "p1"], std::f64::consts::E)?;
    let mut y: Vec<f64> = timepoints().into_iter().map(|t| x2(t, k1, k2)).collect();
    add_gaussian_noise(&mut y, NOISE, rng)?;
    let mut data = SumStats::default();
    data.insert("y", y);
    Ok(data)
}

/// Conversion reaction where some observations are set to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CRErrorZeroProblem {
    pub n_obs_error: usize,
}

impl CRErrorZeroProblem {
    pub fn new(n_obs_error: usize) -> Self {
        CRErrorZeroProblem { n_obs_error }
    }
}

impl Default for CRErrorZeroProblem {
    fn default() -> Self {
        CRErrorZeroProblem::new(2)
    }
}

impl Problem for CRErrorZeroProblem {
    fn name(&self) -> ProblemType {
        ProblemType::CrZero
    }

    fn get_prior_bounds(&self) -> Prior {
        prior()
    }

    fn get_gt_par(&self) -> Parameter {
        gt_par()
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec!["y".to_string()]
    }

    fn get_id(&self) -> String {
        format!("cr_zero_{}", self.n_obs_error)
    }

    fn error_model(&self) -> ErrorModel {
        ErrorModel::new(ErrorKind::Zero { n: self.n_obs_error })
    }

    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats> {
        simulate_conversion(par, rng)
    }
}

/// Conversion reaction where pairs of adjacent observations are swapped, as
/// when mislabelling samples.
#[derive(Debug, Clone, PartialEq)]
pub struct CRErrorSwapProblem {
    /// Number of swapped pairs
    pub n_obs_error: usize,
}

impl CRErrorSwapProblem {
    pub fn new(n_obs_error: usize) -> Self {
        CRErrorSwapProblem { n_obs_error }
    }
}

impl Default for CRErrorSwapProblem {
    fn default() -> Self {
        CRErrorSwapProblem::new(2)
    }
}

impl Problem for CRErrorSwapProblem {
    fn name(&self) -> ProblemType {
        ProblemType::CrSwap
    }

    fn get_prior_bounds(&self) -> Prior {
        prior()
    }

    fn get_gt_par(&self) -> Parameter {
        gt_par()
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec!["y".to_string()]
    }

    fn get_id(&self) -> String {
        format!("cr_swap_{}", self.n_obs_error)
    }

    fn error_model(&self) -> ErrorModel {
        ErrorModel::new(ErrorKind::Swap { n: self.n_obs_error })
    }

    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats> {
        simulate_conversion(par, rng)
    }
}
