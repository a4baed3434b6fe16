//! Errors corrupting the observed data with outliers.
use anyhow::ensure;
use rand::seq::index::sample;
use rand_distr::{Distribution, Normal, Uniform};
use rand_pcg::Pcg64Mcg;
use serde::Serialize;

use crate::problem::SumStats;

/// How the selected observations are corrupted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Add `offset` to `n` observations
    Offset { n: usize, offset: f64 },
    /// Add centered gaussian noise with standard deviation `sd` to `n`
    /// observations
    Gaussian { n: usize, sd: f64 },
    /// Set `n` observations to zero
    Zero { n: usize },
    /// Swap the values of `n` disjoint pairs of adjacent observations
    Swap { n: usize },
    /// Multiply a fraction `frac` of the observations by a factor sampled
    /// uniformly in `[low, high)`, drawing the outliers among the non-zero
    /// observations
    Fraction { frac: f64, low: f64, high: f64 },
    None,
}

/// An error applied to the observations of `keys`, or to all the observations
/// when `keys` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorModel {
    pub kind: ErrorKind,
    pub keys: Option<Vec<String>>,
}

/// The corrupted data with the position of the outliers, as `(key, idx)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Corrupted {
    pub data: SumStats,
    pub outliers: Vec<(String, usize)>,
}

impl ErrorModel {
    pub fn new(kind: ErrorKind) -> Self {
        ErrorModel { kind, keys: None }
    }

    pub fn on_keys(kind: ErrorKind, keys: &[&str]) -> Self {
        ErrorModel {
            kind,
            keys: Some(keys.iter().map(|k| k.to_string()).collect()),
        }
    }

    pub fn is_identity(&self) -> bool {
        //! Whether the error leaves the data untouched.
        match self.kind {
            ErrorKind::Offset { n, .. }
            | ErrorKind::Gaussian { n, .. }
            | ErrorKind::Zero { n }
            | ErrorKind::Swap { n } => n == 0,
            ErrorKind::Fraction { frac, .. } => frac <= 0.,
            ErrorKind::None => true,
        }
    }

    fn positions(&self, data: &SumStats) -> anyhow::Result<Vec<(String, usize)>> {
        let keys = match &self.keys {
            Some(keys) => {
                for key in keys {
                    ensure!(
                        data.get(key).is_some(),
                        "Cannot corrupt {}, found keys {:?}",
                        key,
                        data.keys()
                    );
                }
                keys.clone()
            }
            None => data.keys(),
        };
        Ok(keys
            .into_iter()
            .flat_map(|key| {
                let len = data.get(&key).map(|v| v.len()).unwrap_or_default();
                (0..len).map(move |idx| (key.clone(), idx))
            })
            .collect())
    }

    pub fn apply(
        &self,
        data: &mut SumStats,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<Vec<(String, usize)>> {
        //! Corrupt `data` in place and return the positions of the outliers
        //! sorted by key and index. The number of outliers is clamped to the
        //! number of observations.
        let positions = self.positions(data)?;
        let len = positions.len();

        let mut outliers: Vec<(String, usize)> = match self.kind {
            ErrorKind::None => Vec::new(),
            ErrorKind::Offset { n, offset } => {
                let selected = select(&positions, n, rng);
                for (key, idx) in selected.iter() {
                    *value_mut(data, key, *idx)? += offset;
                }
                selected
            }
            ErrorKind::Gaussian { n, sd } => {
                ensure!(sd > 0., "Found non-positive standard deviation {}", sd);
                let normal = Normal::new(0., sd)?;
                let selected = select(&positions, n, rng);
                for (key, idx) in selected.iter() {
                    *value_mut(data, key, *idx)? += normal.sample(rng);
                }
                selected
            }
            ErrorKind::Zero { n } => {
                let selected = select(&positions, n, rng);
                for (key, idx) in selected.iter() {
                    *value_mut(data, key, *idx)? = 0.;
                }
                selected
            }
            ErrorKind::Swap { n } => {
                let nb_pairs = len / 2;
                let mut selected = Vec::with_capacity(2 * n.min(nb_pairs));
                for pair in sample(rng, nb_pairs, n.min(nb_pairs)).into_iter() {
                    let (first, second) =
                        (&positions[2 * pair], &positions[2 * pair + 1]);
                    let a = *value_mut(data, &first.0, first.1)?;
                    let b = *value_mut(data, &second.0, second.1)?;
                    *value_mut(data, &first.0, first.1)? = b;
                    *value_mut(data, &second.0, second.1)? = a;
                    selected.push(first.clone());
                    selected.push(second.clone());
                }
                selected
            }
            ErrorKind::Fraction { frac, low, high } => {
                ensure!(
                    (0. ..=1.).contains(&frac),
                    "Found fraction of errors {} not in [0, 1]",
                    frac
                );
                let n = (frac * len as f64).round() as usize;
                if n == 0 {
                    Vec::new()
                } else {
                    ensure!(
                        low < high && !(low..high).contains(&1.),
                        "Found range of factors [{}, {}) that can leave values unchanged",
                        low,
                        high
                    );
                    // zeros are left unchanged by any factor
                    let nonzero: Vec<(String, usize)> = positions
                        .into_iter()
                        .filter(|(key, idx)| {
                            data.get(key).map_or(false, |values| values[*idx] != 0.)
                        })
                        .collect();
                    ensure!(
                        nonzero.len() >= n,
                        "Cannot corrupt {} observations, found only {} non-zero",
                        n,
                        nonzero.len()
                    );
                    let factor = Uniform::new(low, high);
                    let selected = select(&nonzero, n, rng);
                    for (key, idx) in selected.iter() {
                        *value_mut(data, key, *idx)? *= factor.sample(rng);
                    }
                    selected
                }
            }
        };
        outliers.sort();
        Ok(outliers)
    }
}

fn select(
    positions: &[(String, usize)],
    n: usize,
    rng: &mut Pcg64Mcg,
) -> Vec<(String, usize)> {
    //! Draw `n` positions without replacement.
    sample(rng, positions.len(), n.min(positions.len()))
        .into_iter()
        .map(|i| positions[i].clone())
        .collect()
}

fn value_mut<'a>(
    data: &'a mut SumStats,
    key: &str,
    idx: usize,
) -> anyhow::Result<&'a mut f64> {
    data.0
        .get_mut(key)
        .and_then(|values| values.get_mut(idx))
        .ok_or_else(|| anyhow::anyhow!("Cannot find observation {} of {}", idx, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn data() -> SumStats {
        let mut data = SumStats::default();
        data.insert("x", vec![1., 2., 3., 4.]);
        data.insert("y", vec![5., 6., 7., 8., 9., 10.]);
        data
    }

    fn nb_changed(before: &SumStats, after: &SumStats) -> usize {
        before
            .flatten()
            .iter()
            .zip(after.flatten().iter())
            .filter(|(b, a)| b != a)
            .count()
    }

    #[quickcheck]
    fn offset_changes_n_observations(n: u8, seed: u64) -> bool {
        let n = (n % 15) as usize;
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut corrupted = data();
        let model = ErrorModel::new(ErrorKind::Offset { n, offset: 100. });
        let outliers = model.apply(&mut corrupted, &mut rng).unwrap();
        outliers.len() == n.min(10) && nb_changed(&data(), &corrupted) == n.min(10)
    }

    #[quickcheck]
    fn identity_when_no_errors(seed: u64) -> bool {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        [
            ErrorKind::Offset { n: 0, offset: 4. },
            ErrorKind::Gaussian { n: 0, sd: 10. },
            ErrorKind::Zero { n: 0 },
            ErrorKind::Swap { n: 0 },
            ErrorKind::Fraction { frac: 0., low: 2., high: 5. },
            ErrorKind::None,
        ]
        .into_iter()
        .all(|kind| {
            let model = ErrorModel::new(kind);
            let mut corrupted = data();
            model.is_identity()
                && model.apply(&mut corrupted, &mut rng).unwrap().is_empty()
                && corrupted == data()
        })
    }

    #[test]
    fn offset_restricted_to_keys() {
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let mut corrupted = data();
        let model =
            ErrorModel::on_keys(ErrorKind::Offset { n: 10, offset: 4. }, &["x"]);
        let outliers = model.apply(&mut corrupted, &mut rng).unwrap();
        assert_eq!(
            outliers,
            (0..4).map(|i| ("x".to_string(), i)).collect::<Vec<_>>()
        );
        assert_eq!(corrupted.get("x").unwrap(), &[5., 6., 7., 8.]);
        assert_eq!(corrupted.get("y"), data().get("y"));
    }

    #[test]
    fn unknown_key() {
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let model = ErrorModel::on_keys(ErrorKind::Zero { n: 1 }, &["z"]);
        assert!(model.apply(&mut data(), &mut rng).is_err());
    }

    #[test]
    fn zero_sets_to_zero() {
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let mut corrupted = data();
        let outliers = ErrorModel::new(ErrorKind::Zero { n: 3 })
            .apply(&mut corrupted, &mut rng)
            .unwrap();
        assert_eq!(outliers.len(), 3);
        for (key, idx) in outliers {
            assert_eq!(corrupted.get(&key).unwrap()[idx], 0.);
        }
        assert_eq!(corrupted.flatten().iter().filter(|v| **v == 0.).count(), 3);
    }

    #[quickcheck]
    fn swap_keeps_values(n: u8, seed: u64) -> bool {
        let n = (n % 8) as usize;
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut corrupted = data();
        let outliers = ErrorModel::new(ErrorKind::Swap { n })
            .apply(&mut corrupted, &mut rng)
            .unwrap();
        let mut values = corrupted.flatten();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        // 5 disjoint pairs of distinct values
        values == data().flatten()
            && outliers.len() == 2 * n.min(5)
            && nb_changed(&data(), &corrupted) == 2 * n.min(5)
    }

    #[test]
    fn fraction_multiplies_by_factor() {
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let mut corrupted = data();
        let outliers = ErrorModel::new(ErrorKind::Fraction {
            frac: 0.25,
            low: 2.,
            high: 5.,
        })
        .apply(&mut corrupted, &mut rng)
        .unwrap();
        // round(0.25 * 10)
        assert_eq!(outliers.len(), 3);
        for (key, idx) in outliers {
            let ratio =
                corrupted.get(&key).unwrap()[idx] / data().get(&key).unwrap()[idx];
            assert!((2. ..5.).contains(&ratio));
        }
    }

    #[quickcheck]
    fn fraction_changes_every_outlier(seed: u64) -> bool {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut sparse = SumStats::default();
        sparse.insert("x", vec![0., 0., 1., 0., 2., 0., 0., 3., 0., 4.]);
        let mut corrupted = sparse.clone();
        let outliers = ErrorModel::new(ErrorKind::Fraction {
            frac: 0.4,
            low: 2.,
            high: 5.,
        })
        .apply(&mut corrupted, &mut rng)
        .unwrap();
        // the 4 non-zero values are all corrupted
        outliers == [2, 4, 7, 9].map(|i| ("x".to_string(), i)).to_vec()
            && nb_changed(&sparse, &corrupted) == 4
    }

    #[test]
    fn fraction_needs_enough_non_zero_values() {
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let mut sparse = SumStats::default();
        sparse.insert("x", vec![0., 0., 1., 0.]);
        let model = ErrorModel::new(ErrorKind::Fraction { frac: 0.5, low: 2., high: 5. });
        assert!(model.apply(&mut sparse, &mut rng).is_err());
        let identity = ErrorModel::new(ErrorKind::Fraction { frac: 0.5, low: 0.5, high: 2. });
        assert!(identity.apply(&mut data(), &mut rng).is_err());
    }

    #[test]
    fn same_seed_same_outliers() {
        let model = ErrorModel::new(ErrorKind::Gaussian { n: 2, sd: 10. });
        let (mut first, mut second) = (data(), data());
        let outliers1 =
            model.apply(&mut first, &mut Pcg64Mcg::seed_from_u64(27)).unwrap();
        let outliers2 =
            model.apply(&mut second, &mut Pcg64Mcg::seed_from_u64(27)).unwrap();
        assert_eq!(outliers1, outliers2);
        assert_eq!(first, second);
    }
}
