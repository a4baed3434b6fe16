//! Rates of the reactions and the uniform ranges they are sampled from.
use rand::Rng;
use rand_distr::{Distribution, Open01, Uniform};
use rand_pcg::Pcg64Mcg;
use serde::Serialize;
use std::fmt::{self, Display};

/// A half-open interval `[min, max)` from which values can be sampled
/// uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Range<T> {
    min: T,
    max: T,
}

impl<T: Display> Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.min, self.max)
    }
}

impl<T> Range<T>
where
    T: Display + Copy + rand_distr::uniform::SampleUniform + PartialOrd,
{
    pub fn new(min: T, max: T) -> Range<T> {
        if min >= max {
            panic!("Found min {} greater than max {}", min, max)
        }
        Range { min, max }
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, value: &T) -> bool {
        //! Closed on both sides, the upper bound has zero probability anyway.
        &self.min <= value && value <= &self.max
    }

    pub fn sample_uniformly(&self, rng: &mut Pcg64Mcg) -> T {
        Uniform::new(self.min, self.max).sample(rng)
    }
}

impl Range<f64> {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Gillespie rate, a.k.a. propensity of a reaction
pub type GillespieRate = f64;

pub fn exprand(lambda: GillespieRate, rng: &mut Pcg64Mcg) -> f64 {
    //! Generates a random waiting time using the exponential waiting time with
    //! parameter `lambda` of Poisson StochasticProcess.
    if (lambda - 0_f64).abs() < f64::EPSILON {
        f64::INFINITY
    } else {
        // random number between (0, 1)
        let val: f64 = rng.sample(Open01);
        -(1. - val).ln() / lambda
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[quickcheck]
    fn exprand_same_seed(lambda: f64, seed: u64) -> bool {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        if lambda == 0f64 {
            exprand(lambda, &mut rng).is_infinite()
        } else if lambda.is_nan() {
            exprand(lambda, &mut rng).is_nan()
        } else {
            let exp1 = exprand(lambda, &mut rng);
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            let exp2 = exprand(lambda, &mut rng);
            (exp1 - exp2).abs() < f64::EPSILON
        }
    }

    #[test]
    fn test_exprand() {
        let mut rng = Pcg64Mcg::seed_from_u64(1u64);
        let lambda: GillespieRate = 0_f64;
        let first = exprand(lambda, &mut rng);
        assert!(first.is_infinite());

        let lambda: GillespieRate = f64::INFINITY;
        let first = exprand(lambda, &mut rng);
        assert!((0f64 - first).abs() < f64::EPSILON);
    }

    #[quickcheck]
    fn range_samples_within_bounds(min: i16, width: u8, seed: u64) -> bool {
        let min = min as f64;
        let range = Range::new(min, min + width as f64 + 1.);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        (0..10).all(|_| range.contains(&range.sample_uniformly(&mut rng)))
    }

    #[test]
    #[should_panic]
    fn range_min_greater_than_max() {
        Range::new(2f64, 1f64);
    }

    #[test]
    fn range_display() {
        assert_eq!(Range::new(-6, 2).to_string(), "-6_2");
    }
}
