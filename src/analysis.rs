//! Collect the results of the ABC-SMC runs for each problem, distance,
//! regime and repetition, and aggregate them across repetitions.
use anyhow::{ensure, Context};
use indicatif::ParallelProgressIterator;
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use slad_history::stats::{credible_interval, mean_std, weighted_rmse};
use slad_history::History;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DATA_DIR, DATA_DIR_HIST, N_REP, TUMOR_DISTANCE_NAMES};
use crate::problem::{AnyProblem, Problem, ProblemType, Regime};

/// Where the sampler stores the databases of the runs, one per problem,
/// repetition and distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLayout {
    pub data_dir: PathBuf,
    pub n_rep: usize,
}

impl RunLayout {
    pub fn new(data_dir: PathBuf, n_rep: usize) -> Self {
        RunLayout { data_dir, n_rep }
    }

    pub fn with_hist(hist: bool) -> Self {
        //! The default layout, of the runs with the histogram-based data when
        //! `hist`.
        let data_dir = if hist { DATA_DIR_HIST } else { DATA_DIR };
        RunLayout::new(PathBuf::from(data_dir), N_REP)
    }

    pub fn db_path(&self, problem_id: &str, rep: usize, distance: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}", problem_id, rep))
            .join(format!("db_{}.db", distance))
    }

    pub fn reps_read(&self, problem_type: ProblemType, distance: &str) -> Vec<usize> {
        //! The repetitions whose database is read: the tumour problem is run
        //! once and only for a subset of the distances.
        match problem_type {
            ProblemType::Tumor if TUMOR_DISTANCE_NAMES.contains(&distance) => vec![0],
            ProblemType::Tumor => Vec::new(),
            _ => (0..self.n_rep).collect(),
        }
    }

    pub fn status(
        &self,
        problem_type: ProblemType,
        distances: &[&str],
    ) -> anyhow::Result<Vec<(PathBuf, bool)>> {
        //! All the databases expected for `problem_type` and whether they exist.
        let mut paths = Vec::new();
        for regime in Regime::BOTH {
            let id = problem_type.build(regime)?.get_id();
            for distance in distances {
                for rep in self.reps_read(problem_type, distance) {
                    let path = self.db_path(&id, rep, distance);
                    let exists = path.is_file();
                    paths.push((path, exists));
                }
            }
        }
        Ok(paths)
    }
}

/// The quantity extracted from the last generation of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    /// Effective sample size of the posterior weights
    Ess,
    /// Weighted root mean squared error to the ground truth, per parameter
    Rmse,
    /// For each parameter and credible level, whether the central credible
    /// interval covers the ground truth
    Coverage(Vec<f64>),
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Ess => "ess",
            Metric::Rmse => "rmse",
            Metric::Coverage(_) => "calibration",
        }
    }

    pub fn labels(&self, problem: &AnyProblem) -> Vec<String> {
        //! The names of the values computed for `problem`.
        let names = problem.get_gt_par().names();
        match self {
            Metric::Ess => vec!["ess".to_string()],
            Metric::Rmse => names,
            Metric::Coverage(levels) => names
                .iter()
                .flat_map(|name| levels.iter().map(move |l| format!("{}_{:.2}", name, l)))
                .collect(),
        }
    }

    pub fn compute(&self, history: &History, problem: &AnyProblem) -> anyhow::Result<Vec<f64>> {
        let distribution = history.get_distribution(0, history.max_t()?)?;
        let gt_par = problem.get_gt_par();
        let column = |name: &str| {
            distribution.column(name).with_context(|| {
                format!("Cannot find parameter {} in {:#?}", name, history.path())
            })
        };

        match self {
            Metric::Ess => Ok(vec![distribution.effective_sample_size()]),
            Metric::Rmse => gt_par
                .0
                .iter()
                .map(|(name, gt)| weighted_rmse(&column(name.as_str())?, &distribution.weights, *gt))
                .collect(),
            Metric::Coverage(levels) => {
                let mut covered = Vec::with_capacity(gt_par.0.len() * levels.len());
                for (name, gt) in gt_par.0.iter() {
                    let values = column(name.as_str())?;
                    for level in levels {
                        let (lb, ub) =
                            credible_interval(&values, &distribution.weights, *level)?;
                        covered.push(if lb <= *gt && *gt <= ub { 1. } else { 0. });
                    }
                }
                Ok(covered)
            }
        }
    }
}

/// The values of a metric for one problem, indexed by distance, regime (0
/// outlier-free, 1 corrupted), repetition and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub problem_type: ProblemType,
    pub distances: Vec<String>,
    pub labels: Vec<String>,
    pub values: Vec<[Vec<Vec<f64>>; 2]>,
}

/// Mean and standard deviation across repetitions, indexed by distance,
/// regime and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub problem_type: ProblemType,
    pub distances: Vec<String>,
    pub labels: Vec<String>,
    pub means: Vec<[Vec<f64>; 2]>,
    pub stds: Vec<[Vec<f64>; 2]>,
}

#[derive(Debug, Serialize)]
struct AggregatedRecord<'a> {
    problem: String,
    distance: &'a str,
    regime: &'static str,
    value: &'a str,
    mean: f64,
    std: f64,
}

struct Job<'a> {
    distance_idx: usize,
    regime_idx: usize,
    distance: &'a str,
    rep: usize,
    path: PathBuf,
}

pub fn collect(
    layout: &RunLayout,
    problem_type: ProblemType,
    distances: &[&str],
    metric: &Metric,
    verbosity: u8,
) -> anyhow::Result<Collected> {
    //! Read the last generation of all the runs of `problem_type` in
    //! parallel. Repetitions of the tumour problem copy the first one and
    //! distances not run on it are zero.
    //!
    //! Fails naming a missing database when some runs are missing.
    let problems: Vec<AnyProblem> = Regime::BOTH
        .iter()
        .map(|regime| problem_type.build(*regime))
        .collect::<anyhow::Result<_>>()?;
    let labels = metric.labels(&problems[0]);

    let mut jobs = Vec::new();
    for (distance_idx, distance) in distances.iter().enumerate() {
        for (regime_idx, problem) in problems.iter().enumerate() {
            for rep in layout.reps_read(problem_type, distance) {
                let path = layout.db_path(&problem.get_id(), rep, distance);
                jobs.push(Job { distance_idx, regime_idx, distance, rep, path });
            }
        }
    }
    if verbosity > 0 {
        println!(
            "Reading {} databases of {} from {:#?}",
            jobs.len(),
            problem_type,
            layout.data_dir
        );
    }

    let nb_jobs = jobs.len() as u64;
    let results = jobs
        .into_par_iter()
        .progress_count(nb_jobs)
        .map(|job| -> anyhow::Result<(usize, usize, usize, Vec<f64>)> {
            let history = History::open(&job.path)?;
            let values = metric
                .compute(&history, &problems[job.regime_idx])
                .with_context(|| format!("Cannot compute the {} of {:#?}", metric.name(), job.path))?;
            if verbosity > 1 {
                println!("{} rep {}: {:?}", job.distance, job.rep, values);
            }
            Ok((job.distance_idx, job.regime_idx, job.rep, values))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let zeros = vec![0.; labels.len()];
    let mut values: Vec<[Vec<Vec<f64>>; 2]> = distances
        .iter()
        .map(|_| [vec![zeros.clone(); layout.n_rep], vec![zeros.clone(); layout.n_rep]])
        .collect();
    for (distance_idx, regime_idx, rep, result) in results {
        ensure!(
            result.len() == labels.len(),
            "Found {} values but expected {}",
            result.len(),
            labels.len()
        );
        let reps = &mut values[distance_idx][regime_idx];
        match problem_type {
            ProblemType::Tumor => reps.iter_mut().for_each(|r| *r = result.clone()),
            _ => reps[rep] = result,
        }
    }

    Ok(Collected {
        problem_type,
        distances: distances.iter().map(|d| d.to_string()).collect(),
        labels,
        values,
    })
}

impl Collected {
    pub fn aggregate(&self) -> Aggregated {
        let mut means = Vec::with_capacity(self.distances.len());
        let mut stds = Vec::with_capacity(self.distances.len());
        for regimes in self.values.iter() {
            let (mean, std): (Vec<[f64; 2]>, Vec<[f64; 2]>) = (0..self.labels.len())
                .map(|value_idx| {
                    let stats: Vec<(f64, f64)> = regimes
                        .iter()
                        .map(|reps| {
                            mean_std(&reps.iter().map(|r| r[value_idx]).collect::<Vec<f64>>())
                        })
                        .collect();
                    ([stats[0].0, stats[1].0], [stats[0].1, stats[1].1])
                })
                .unzip();
            means.push([0, 1].map(|regime| mean.iter().map(|m| m[regime]).collect()));
            stds.push([0, 1].map(|regime| std.iter().map(|s| s[regime]).collect()));
        }
        Aggregated {
            problem_type: self.problem_type,
            distances: self.distances.clone(),
            labels: self.labels.clone(),
            means,
            stds,
        }
    }
}

impl Aggregated {
    pub fn label_idx(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn max_mean(&self, value_idx: usize) -> f64 {
        //! The largest mean over all distances and regimes, zero when all the
        //! values are missing.
        self.means
            .iter()
            .flat_map(|regimes| regimes.iter().map(|m| m[value_idx]))
            .filter(|m| m.is_finite())
            .fold(0., f64::max)
    }

    pub fn save(&self, path: &Path, verbosity: u8) -> anyhow::Result<()> {
        //! Write a csv table with one row per distance, regime and value.
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create dir {:#?}", parent))?;
        }
        if verbosity > 1 {
            println!("Saving the aggregated values to {:#?}", path);
        }
        let mut wtr = csv::Writer::from_path(path)?;
        for (d, distance) in self.distances.iter().enumerate() {
            for (r, regime) in Regime::BOTH.iter().enumerate() {
                for (v, value) in self.labels.iter().enumerate() {
                    wtr.serialize(AggregatedRecord {
                        problem: self.problem_type.to_string(),
                        distance,
                        regime: regime.label(),
                        value,
                        mean: self.means[d][r][v],
                        std: self.stds[d][r][v],
                    })
                    .with_context(|| "Cannot serialize the aggregated values".to_string())?;
                }
            }
        }
        wtr.flush()?;
        Ok(())
    }
}
