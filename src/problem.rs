//! The contract every test problem satisfies to be plugged into the ABC
//! sampler: a uniform prior, a stochastic forward model, observed data
//! generated from ground-truth parameters and corrupted by an error model.
use anyhow::{ensure, Context};
use clap::ValueEnum;
use enum_dispatch::enum_dispatch;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use slad_sim::rate::Range;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{
    CRErrorSwapProblem, CRErrorZeroProblem, GaussianErrorProblem,
    PrangleGKErrorProblem, PrangleLVErrorProblem, TumorErrorProblem,
    TumorErrorProblemBuilder, UninfErrorProblem,
};
use crate::outlier::{Corrupted, ErrorModel};

/// Seed used to simulate the observed data at the ground-truth parameters.
pub const OBS_SEED: u64 = 26;
/// Seed used to draw the corrupted observations.
pub const ERROR_SEED: u64 = 27;

/// Parameter values by name, names sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter(pub BTreeMap<String, f64>);

impl Parameter {
    pub fn get(&self, name: &str) -> anyhow::Result<f64> {
        self.0
            .get(name)
            .copied()
            .with_context(|| format!("Cannot find parameter {}", name))
    }

    pub fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Parameter {
    fn from(values: [(&str, f64); N]) -> Self {
        Parameter(
            values.into_iter().map(|(name, v)| (name.to_string(), v)).collect(),
        )
    }
}

/// The observable of a problem: blocks of values by key, keys sorted
/// lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SumStats(pub BTreeMap<String, Vec<f64>>);

impl SumStats {
    pub fn insert(&mut self, key: &str, values: Vec<f64>) {
        self.0.insert(key.to_string(), values);
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flatten(&self) -> Vec<f64> {
        //! All the values, blocks concatenated in key order.
        self.0.values().flatten().copied().collect()
    }

    pub fn flat_names(&self) -> Vec<String> {
        //! Name of each value of `flatten`, i.e. `{key}_{idx}`.
        self.0
            .iter()
            .flat_map(|(key, values)| {
                (0..values.len()).map(move |i| format!("{}_{}", key, i))
            })
            .collect()
    }
}

/// Independent uniform priors, in the order the parameters are declared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prior(pub Vec<(String, Range<f64>)>);

impl Prior {
    pub fn new(bounds: &[(&str, f64, f64)]) -> Self {
        Prior(
            bounds
                .iter()
                .map(|(name, low, high)| (name.to_string(), Range::new(*low, *high)))
                .collect(),
        )
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn sample(&self, rng: &mut Pcg64Mcg) -> Parameter {
        Parameter(
            self.0
                .iter()
                .map(|(name, range)| (name.clone(), range.sample_uniformly(rng)))
                .collect(),
        )
    }

    pub fn pdf(&self, par: &Parameter) -> f64 {
        //! Product of the uniform densities, zero outside of the bounds or when
        //! a parameter is missing.
        self.0
            .iter()
            .map(|(name, range)| match par.0.get(name) {
                Some(v) if range.contains(v) => 1. / range.width(),
                _ => 0.,
            })
            .product()
    }
}

#[enum_dispatch]
pub trait Problem {
    /// The type of problem, shared by all its error configurations.
    fn name(&self) -> ProblemType;

    fn get_prior_bounds(&self) -> Prior;

    fn get_gt_par(&self) -> Parameter;

    /// The keys of the simulated data.
    fn get_y_keys(&self) -> Vec<String>;

    /// Unique identifier of the model and its error configuration.
    fn get_id(&self) -> String;

    /// The errors corrupting the observed data.
    fn error_model(&self) -> ErrorModel;

    /// Simulate the data for `par`, including the measurement noise but never
    /// the outliers.
    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats>;

    fn sample_prior(&self, rng: &mut Pcg64Mcg) -> Parameter {
        self.get_prior_bounds().sample(rng)
    }

    fn prior_pdf(&self, par: &Parameter) -> f64 {
        self.get_prior_bounds().pdf(par)
    }

    fn get_obs(&self) -> anyhow::Result<SumStats> {
        //! The observed data, always the same for a given problem.
        Ok(self.get_obs_with_outliers()?.data)
    }

    fn get_obs_with_outliers(&self) -> anyhow::Result<Corrupted> {
        //! Simulate the data at the ground truth and corrupt it, keeping track
        //! of the corrupted entries. The same seeds are used for each call.
        let mut rng = Pcg64Mcg::seed_from_u64(OBS_SEED);
        let mut data = self
            .simulate(&self.get_gt_par(), &mut rng)
            .with_context(|| format!("Cannot simulate the data of {}", self.get_id()))?;
        let mut rng = Pcg64Mcg::seed_from_u64(ERROR_SEED);
        let outliers = self.error_model().apply(&mut data, &mut rng)?;
        Ok(Corrupted { data, outliers })
    }
}

/// All the test problems.
#[enum_dispatch(Problem)]
#[derive(Debug, Clone)]
pub enum AnyProblem {
    UninfErrorProblem,
    GaussianErrorProblem,
    PrangleGKErrorProblem,
    PrangleLVErrorProblem,
    CRErrorZeroProblem,
    CRErrorSwapProblem,
    TumorErrorProblem,
}

/// Whether the observed data contains outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Regime {
    OutlierFree,
    Corrupted,
}

impl Regime {
    pub const BOTH: [Regime; 2] = [Regime::OutlierFree, Regime::Corrupted];

    pub fn label(&self) -> &'static str {
        match self {
            Regime::OutlierFree => "Outlier-free",
            Regime::Corrupted => "Outlier-corrupted",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProblemType {
    Uninf,
    Gaussian,
    Gk,
    Lv,
    CrZero,
    CrSwap,
    Tumor,
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProblemType::Uninf => "uninf",
            ProblemType::Gaussian => "gaussian",
            ProblemType::Gk => "gk",
            ProblemType::Lv => "lv",
            ProblemType::CrZero => "cr-zero",
            ProblemType::CrSwap => "cr-swap",
            ProblemType::Tumor => "tumor",
        };
        write!(f, "{}", name)
    }
}

impl ProblemType {
    /// The problems shown in the figures, in the order of the panels.
    pub const FIGURES: [ProblemType; 6] = [
        ProblemType::Uninf,
        ProblemType::Gaussian,
        ProblemType::CrZero,
        ProblemType::Gk,
        ProblemType::Lv,
        ProblemType::Tumor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProblemType::Uninf => "Uninformative",
            ProblemType::Gaussian => "Gaussian",
            ProblemType::Gk => "G-and-k",
            ProblemType::Lv => "Lotka-Volterra",
            ProblemType::CrZero => "Conversion (zero)",
            ProblemType::CrSwap => "Conversion (swap)",
            ProblemType::Tumor => "Tumor",
        }
    }

    pub fn build(&self, regime: Regime) -> anyhow::Result<AnyProblem> {
        //! The problem with its default errors when `Corrupted`, without any
        //! outlier when `OutlierFree`.
        let problem: AnyProblem = match (self, regime) {
            (ProblemType::Uninf, Regime::Corrupted) => UninfErrorProblem::default().into(),
            (ProblemType::Uninf, Regime::OutlierFree) => UninfErrorProblem::new(0).into(),
            (ProblemType::Gaussian, Regime::Corrupted) => {
                GaussianErrorProblem::default().into()
            }
            (ProblemType::Gaussian, Regime::OutlierFree) => {
                GaussianErrorProblem::new(0).into()
            }
            (ProblemType::Gk, Regime::Corrupted) => PrangleGKErrorProblem::default().into(),
            (ProblemType::Gk, Regime::OutlierFree) => PrangleGKErrorProblem::new(0).into(),
            (ProblemType::Lv, Regime::Corrupted) => PrangleLVErrorProblem::default().into(),
            (ProblemType::Lv, Regime::OutlierFree) => PrangleLVErrorProblem::new(0).into(),
            (ProblemType::CrZero, Regime::Corrupted) => CRErrorZeroProblem::default().into(),
            (ProblemType::CrZero, Regime::OutlierFree) => CRErrorZeroProblem::new(0).into(),
            (ProblemType::CrSwap, Regime::Corrupted) => CRErrorSwapProblem::default().into(),
            (ProblemType::CrSwap, Regime::OutlierFree) => CRErrorSwapProblem::new(0).into(),
            (ProblemType::Tumor, regime) => {
                let frac_error = match regime {
                    Regime::OutlierFree => 0.,
                    Regime::Corrupted => 0.1,
                };
                TumorErrorProblemBuilder::default()
                    .noisy(true)
                    .frac_error(frac_error)
                    .build()
                    .context("Cannot build the tumor problem")?
                    .into()
            }
        };
        ensure!(problem.name() == *self);
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_pdf_inside_and_outside() {
        let prior = Prior::new(&[("a", 0., 10.), ("b", -1., 1.)]);
        let inside = Parameter::from([("a", 5.), ("b", 0.)]);
        assert!((prior.pdf(&inside) - 0.05).abs() < 1e-12);
        let outside = Parameter::from([("a", 11.), ("b", 0.)]);
        assert_eq!(prior.pdf(&outside), 0.);
        let missing = Parameter::from([("a", 5.)]);
        assert_eq!(prior.pdf(&missing), 0.);
    }

    #[quickcheck]
    fn prior_samples_have_positive_density(seed: u64) -> bool {
        let prior = Prior::new(&[("a", 0., 10.), ("b", -6., 2.)]);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let par = prior.sample(&mut rng);
        par.names() == prior.names() && prior.pdf(&par) > 0.
    }

    #[test]
    fn sumstats_flatten_in_key_order() {
        let mut stats = SumStats::default();
        stats.insert("y", vec![3., 4.]);
        stats.insert("x", vec![1., 2.]);
        assert_eq!(stats.flatten(), vec![1., 2., 3., 4.]);
        assert_eq!(stats.flat_names(), vec!["x_0", "x_1", "y_0", "y_1"]);
        assert_eq!(stats.len(), 4);
        assert_eq!(stats.keys(), vec!["x", "y"]);
    }

    #[test]
    fn problem_type_names() {
        let names: Vec<String> =
            ProblemType::value_variants().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            vec!["uninf", "gaussian", "gk", "lv", "cr-zero", "cr-swap", "tumor"]
        );
    }

    #[test]
    fn build_both_regimes() {
        for problem_type in ProblemType::value_variants() {
            let free = problem_type.build(Regime::OutlierFree).unwrap();
            let corrupted = problem_type.build(Regime::Corrupted).unwrap();
            assert_ne!(free.get_id(), corrupted.get_id());
            assert_eq!(free.get_gt_par(), corrupted.get_gt_par());
            assert!(free.prior_pdf(&free.get_gt_par()) > 0.);
            assert!(free.error_model().is_identity());
            assert!(!corrupted.error_model().is_identity());
        }
    }
}
