//! Weighted Minkowski distances between simulated and observed data, with
//! the weights given by the inverse scale of each statistic.
use anyhow::{bail, ensure, Context};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::problem::SumStats;
use crate::scale::ScaleFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Adaptivity {
    /// Weights computed once on the calibration sample
    Calibrated,
    /// Weights recomputed at each generation
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Norm {
    Euclidean,
    Manhattan,
}

impl Norm {
    pub fn p(&self) -> f64 {
        match self {
            Norm::Euclidean => 2.,
            Norm::Manhattan => 1.,
        }
    }
}

/// A distance configuration such as `Adaptive__Manhattan__mad_or_cmad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DistanceName {
    pub adaptivity: Adaptivity,
    pub norm: Norm,
    pub scale: ScaleFunction,
}

impl fmt::Display for DistanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}__{:?}__{}", self.adaptivity, self.norm, self.scale)
    }
}

impl FromStr for DistanceName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split("__").collect();
        ensure!(fields.len() == 3, "Cannot parse distance name {}", s);
        let adaptivity = match fields[0] {
            "Calibrated" => Adaptivity::Calibrated,
            "Adaptive" => Adaptivity::Adaptive,
            a => bail!("Unknown adaptivity {} in {}", a, s),
        };
        let norm = match fields[1] {
            "Euclidean" => Norm::Euclidean,
            "Manhattan" => Norm::Manhattan,
            n => bail!("Unknown norm {} in {}", n, s),
        };
        let scale = fields[2]
            .parse()
            .with_context(|| format!("Cannot parse distance name {}", s))?;
        Ok(DistanceName { adaptivity, norm, scale })
    }
}

/// A distance to the observed data `x0`, whose weights are set by
/// `initialize` and, when adaptive, by each `update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedDistance {
    pub name: DistanceName,
    x0: SumStats,
    weights: Option<Vec<f64>>,
}

impl WeightedDistance {
    pub fn new(name: DistanceName, x0: SumStats) -> Self {
        WeightedDistance { name, x0, weights: None }
    }

    pub fn weights(&self) -> Option<&[f64]> {
        //! One weight per observation, in the order of `SumStats::flatten`.
        self.weights.as_deref()
    }

    pub fn initialize(&mut self, samples: &[SumStats]) -> anyhow::Result<()> {
        //! Compute the weights on the calibration sample.
        self.weights = Some(self.compute_weights(samples)?);
        Ok(())
    }

    pub fn update(&mut self, samples: &[SumStats]) -> anyhow::Result<bool> {
        //! Recompute the weights on the sample of the last generation when
        //! adaptive. Returns whether the weights have changed.
        ensure!(self.weights.is_some(), "Cannot update a distance never initialised");
        match self.name.adaptivity {
            Adaptivity::Calibrated => Ok(false),
            Adaptivity::Adaptive => {
                let weights = self.compute_weights(samples)?;
                let changed = self.weights.as_ref() != Some(&weights);
                self.weights = Some(weights);
                Ok(changed)
            }
        }
    }

    fn compute_weights(&self, samples: &[SumStats]) -> anyhow::Result<Vec<f64>> {
        ensure!(!samples.is_empty(), "Cannot compute weights without samples");
        let x0 = self.x0.flatten();
        let flattened = samples
            .iter()
            .map(|s| self.flatten_checked(s))
            .collect::<anyhow::Result<Vec<Vec<f64>>>>()?;
        Ok(x0
            .iter()
            .enumerate()
            .map(|(i, x0_i)| {
                let column: Vec<f64> = flattened.iter().map(|row| row[i]).collect();
                let scale = self.name.scale.scale(&column, *x0_i);
                if scale.is_finite() && scale > 0. {
                    1. / scale
                } else {
                    0.
                }
            })
            .collect())
    }

    fn flatten_checked(&self, x: &SumStats) -> anyhow::Result<Vec<f64>> {
        ensure!(
            x.keys() == self.x0.keys() && x.len() == self.x0.len(),
            "Found data with keys {:?} and {} values, expected {:?} and {}",
            x.keys(),
            x.len(),
            self.x0.keys(),
            self.x0.len()
        );
        Ok(x.flatten())
    }

    pub fn distance(&self, x: &SumStats) -> anyhow::Result<f64> {
        //! `(Σ (w_i |x_i - x0_i|)^p)^(1/p)`.
        let weights = self
            .weights
            .as_ref()
            .context("Cannot compute the distance before initialising the weights")?;
        let p = self.name.norm.p();
        let sum: f64 = self
            .flatten_checked(x)?
            .iter()
            .zip(self.x0.flatten().iter())
            .zip(weights.iter())
            // skip 0 * inf for statistics without weight
            .filter(|(_, w)| **w > 0.)
            .map(|((xi, x0i), w)| (w * (xi - x0i).abs()).powf(p))
            .sum();
        Ok(sum.powf(1. / p))
    }
}
