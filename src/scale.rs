//! Scale functions estimating the spread of each summary statistic from a
//! sample of simulations, the inverse of which weighs the statistic in the
//! distance.
use anyhow::bail;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScaleFunction {
    /// Standard deviation
    Std,
    /// Median absolute deviation from the median
    Mad,
    /// Median absolute deviation from the observed value
    Cmad,
    /// Median absolute deviation plus the bias of the median to the observed
    /// value
    Pcmad,
    /// `Cmad` when the observed value is far from the bulk of the simulations,
    /// else `Mad`
    MadOrCmad,
}

impl fmt::Display for ScaleFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleFunction::Std => "std",
            ScaleFunction::Mad => "mad",
            ScaleFunction::Cmad => "cmad",
            ScaleFunction::Pcmad => "pcmad",
            ScaleFunction::MadOrCmad => "mad_or_cmad",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ScaleFunction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "std" => Ok(ScaleFunction::Std),
            "mad" => Ok(ScaleFunction::Mad),
            "cmad" => Ok(ScaleFunction::Cmad),
            "pcmad" => Ok(ScaleFunction::Pcmad),
            "mad_or_cmad" => Ok(ScaleFunction::MadOrCmad),
            _ => bail!("Unknown scale function {}", s),
        }
    }
}

/// `MadOrCmad` switches to `Cmad` when the median is further than
/// `MAD_OR_CMAD_FACTOR` times the `Mad` away from the observed value.
pub const MAD_OR_CMAD_FACTOR: f64 = 2.;

pub fn median(values: &[f64]) -> f64 {
    //! NaN when empty.
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.
    } else {
        sorted[mid]
    }
}

fn median_absolute_deviation(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

impl ScaleFunction {
    pub fn scale(&self, samples: &[f64], x0: f64) -> f64 {
        //! The spread of the simulated `samples` of one statistic whose
        //! observed value is `x0`. NaN when there are no samples.
        if samples.is_empty() {
            return f64::NAN;
        }
        match self {
            ScaleFunction::Std => {
                let n = samples.len() as f64;
                let mean = samples.iter().sum::<f64>() / n;
                (samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
            ScaleFunction::Mad => median_absolute_deviation(samples, median(samples)),
            ScaleFunction::Cmad => median_absolute_deviation(samples, x0),
            ScaleFunction::Pcmad => {
                let center = median(samples);
                median_absolute_deviation(samples, center) + (center - x0).abs()
            }
            ScaleFunction::MadOrCmad => {
                let center = median(samples);
                let mad = median_absolute_deviation(samples, center);
                if (center - x0).abs() > MAD_OR_CMAD_FACTOR * mad {
                    median_absolute_deviation(samples, x0)
                } else {
                    mad
                }
            }
        }
    }
}
