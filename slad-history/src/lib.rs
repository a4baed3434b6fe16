//! The results of the ABC-SMC runs stored by the sampler in one SQLite database
//! per run, and the statistics computed from the weighted posterior samples.
pub mod history;
pub mod stats;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

#[doc(inline)]
pub use crate::history::{Distribution, History, PopulationSummary};
#[doc(inline)]
pub use crate::stats::effective_sample_size;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
