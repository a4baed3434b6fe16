//! Benchmarks of the robustness of ABC distances to outliers: test problems
//! whose observed data is corrupted, the distances compared and the analysis
//! of the runs of the ABC-SMC sampler.
/// Collect and aggregate the results of the runs.
pub mod analysis;
pub mod constants;
/// The distances compared.
pub mod distance;
/// The test problems.
pub mod models;
/// Errors corrupting the observed data.
pub mod outlier;
pub mod problem;
pub mod scale;

#[macro_use]
extern crate derive_builder;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub use distance::{DistanceName, WeightedDistance};
pub use problem::{AnyProblem, Parameter, Problem, ProblemType, Regime, SumStats};
