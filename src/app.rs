use anyhow::Context;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use indicatif::ParallelProgressIterator;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use slad::analysis::RunLayout;
use slad::constants::DISTANCE_NAMES;
use slad::problem::{AnyProblem, Parameter, Problem, ProblemType, SumStats};
use slad::{DistanceName, WeightedDistance};
use slad_sim::Seed;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait Run {
    fn run(&self) -> anyhow::Result<()>;
}

fn write_json<T: Serialize>(value: &T, path: &Option<PathBuf>) -> anyhow::Result<()> {
    //! Pretty-print `value` to `path`, or to stdout when `None`.
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create dir {:#?}", parent))?;
            }
            fs::write(path, json).with_context(|| format!("Cannot write to {:#?}", path))
        }
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn simulate_from_prior(
    problem: &AnyProblem,
    runs: usize,
    seed: Seed,
    sequential: bool,
) -> anyhow::Result<Vec<(Parameter, SumStats)>> {
    //! Sample `runs` parameters from the prior and simulate them, each run
    //! with its own random stream derived from `seed`.
    anyhow::ensure!(
        runs <= Seed::MAX_STREAMS,
        "Cannot simulate {} runs from one seed, the maximum is {}",
        runs,
        Seed::MAX_STREAMS
    );
    let one_run = |idx: usize| -> anyhow::Result<(Parameter, SumStats)> {
        let mut rng = Pcg64Mcg::seed_from_u64(seed.stream(idx)?);
        let par = problem.sample_prior(&mut rng);
        let data = problem
            .simulate(&par, &mut rng)
            .with_context(|| format!("Cannot simulate run {} with {:?}", idx, par))?;
        Ok((par, data))
    };
    if sequential {
        (0..runs).map(one_run).collect()
    } else {
        (0..runs)
            .into_par_iter()
            .progress_count(runs as u64)
            .map(one_run)
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct ProblemInfo {
    id: String,
    problem: String,
    prior: Vec<(String, f64, f64)>,
    ground_truth: Parameter,
    keys: Vec<String>,
    error: slad::outlier::ErrorModel,
}

pub struct Info {
    pub problem: AnyProblem,
}

impl Run for Info {
    fn run(&self) -> anyhow::Result<()> {
        let info = ProblemInfo {
            id: self.problem.get_id(),
            problem: self.problem.name().to_string(),
            prior: self
                .problem
                .get_prior_bounds()
                .0
                .into_iter()
                .map(|(name, range)| (name, range.min(), range.max()))
                .collect(),
            ground_truth: self.problem.get_gt_par(),
            keys: self.problem.get_y_keys(),
            error: self.problem.error_model(),
        };
        write_json(&info, &None)
    }
}

pub struct Obs {
    pub problem: AnyProblem,
    pub path: Option<PathBuf>,
    pub verbosity: u8,
}

impl Run for Obs {
    fn run(&self) -> anyhow::Result<()> {
        let obs = self
            .problem
            .get_obs_with_outliers()
            .with_context(|| format!("Cannot generate the data of {}", self.problem.get_id()))?;
        if self.verbosity > 0 {
            println!("{} outliers at {:?}", obs.outliers.len(), obs.outliers);
        }
        write_json(&obs, &self.path)
    }
}

pub struct Simulate {
    pub problem: AnyProblem,
    pub runs: usize,
    pub seed: Seed,
    pub path2dir: PathBuf,
    pub gzip: bool,
    pub sequential: bool,
    pub verbosity: u8,
}

impl Simulate {
    fn path2file(&self) -> PathBuf {
        let filename = format!("{}_simulations.csv", self.problem.get_id());
        if self.gzip {
            self.path2dir.join(format!("{}.gz", filename))
        } else {
            self.path2dir.join(filename)
        }
    }

    fn save<W: Write>(
        &self,
        writer: W,
        simulations: &[(Parameter, SumStats)],
    ) -> anyhow::Result<()> {
        //! One row per run with the parameters followed by the data.
        let mut wtr = csv::Writer::from_writer(writer);
        let (par, data) = &simulations[0];
        wtr.write_record(par.names().into_iter().chain(data.flat_names()))?;
        for (par, data) in simulations {
            wtr.write_record(
                par.values()
                    .into_iter()
                    .chain(data.flatten())
                    .map(|v| format!("{:.6}", v)),
            )
            .with_context(|| "Cannot serialize the simulations".to_string())?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Run for Simulate {
    fn run(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.runs > 0, "Cannot simulate zero runs");
        let simulations =
            simulate_from_prior(&self.problem, self.runs, self.seed, self.sequential)?;

        fs::create_dir_all(&self.path2dir)
            .with_context(|| format!("Cannot create dir {:#?}", self.path2dir))?;
        let path2file = self.path2file();
        if self.verbosity > 0 {
            println!("Saving {} simulations to {:#?}", self.runs, path2file);
        }
        let file = fs::File::create(&path2file)
            .with_context(|| format!("Cannot create {:#?}", path2file))?;
        if self.gzip {
            let mut encoder = GzEncoder::new(file, Compression::default());
            self.save(&mut encoder, &simulations)?;
            encoder.finish()?;
        } else {
            self.save(file, &simulations)?;
        }
        self.seed.save(&self.path2dir.join("seed.txt"))
    }
}

#[derive(Debug, Serialize)]
struct Calibration {
    id: String,
    distance: String,
    samples: usize,
    weights: BTreeMap<String, f64>,
    /// Median distance of the calibration sample to the observed data
    median_distance: f64,
}

pub struct Calibrate {
    pub problem: AnyProblem,
    pub distance: DistanceName,
    pub samples: usize,
    pub seed: Seed,
    pub path: Option<PathBuf>,
    pub sequential: bool,
    pub verbosity: u8,
}

impl Run for Calibrate {
    fn run(&self) -> anyhow::Result<()> {
        let obs = self.problem.get_obs()?;
        let names = obs.flat_names();
        let simulations: Vec<SumStats> =
            simulate_from_prior(&self.problem, self.samples, self.seed, self.sequential)?
                .into_iter()
                .map(|(_, data)| data)
                .collect();

        let mut distance = WeightedDistance::new(self.distance, obs);
        distance.initialize(&simulations)?;
        let distances = simulations
            .iter()
            .map(|s| distance.distance(s))
            .collect::<anyhow::Result<Vec<f64>>>()?;
        if self.verbosity > 1 {
            println!("Distances of the calibration sample: {:?}", distances);
        }

        let weights = distance
            .weights()
            .context("Found no weights after calibration")?
            .iter()
            .zip(names)
            .map(|(w, name)| (name, *w))
            .collect();
        write_json(
            &Calibration {
                id: self.problem.get_id(),
                distance: self.distance.to_string(),
                samples: self.samples,
                weights,
                median_distance: slad::scale::median(&distances),
            },
            &self.path,
        )
    }
}

pub struct Status {
    pub layout: RunLayout,
    pub problems: Vec<ProblemType>,
    pub verbosity: u8,
}

impl Run for Status {
    fn run(&self) -> anyhow::Result<()> {
        for problem_type in self.problems.iter() {
            let status = self.layout.status(*problem_type, &DISTANCE_NAMES)?;
            let missing: Vec<&Path> = status
                .iter()
                .filter(|(_, exists)| !exists)
                .map(|(path, _)| path.as_path())
                .collect();
            println!(
                "{} {}: {} of {} databases found",
                Utc::now(),
                problem_type,
                status.len() - missing.len(),
                status.len()
            );
            if self.verbosity > 0 {
                for path in missing {
                    println!("\tmissing {:#?}", path);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use slad::models::GaussianErrorProblem;

    #[test]
    fn same_simulations_sequential_or_parallel() {
        let problem: AnyProblem = GaussianErrorProblem::default().into();
        let sequential = simulate_from_prior(&problem, 20, Seed::new(26), true).unwrap();
        let parallel = simulate_from_prior(&problem, 20, Seed::new(26), false).unwrap();
        assert_eq!(sequential.len(), 20);
        assert_eq!(sequential, parallel);
        let other = simulate_from_prior(&problem, 20, Seed::new(27), true).unwrap();
        assert_ne!(sequential, other);
    }

    #[test]
    fn too_many_runs_for_one_seed() {
        let problem: AnyProblem = GaussianErrorProblem::default().into();
        assert!(
            simulate_from_prior(&problem, Seed::MAX_STREAMS + 1, Seed::default(), true)
                .is_err()
        );
    }

    #[test]
    fn simulate_gzipped_table() {
        let dir = tempfile::tempdir().unwrap();
        let simulate = Simulate {
            problem: GaussianErrorProblem::default().into(),
            runs: 5,
            seed: Seed::new(26),
            path2dir: dir.path().join("gaussian"),
            gzip: true,
            sequential: true,
            verbosity: 0,
        };
        simulate.run().unwrap();

        let path = dir.path().join("gaussian").join("gaussian_2_simulations.csv.gz");
        assert_eq!(simulate.path2file(), path);
        let mut rdr =
            csv::Reader::from_reader(GzDecoder::new(fs::File::open(&path).unwrap()));
        let mut expected = vec!["p0".to_string()];
        expected.extend((0..GaussianErrorProblem::N_Y).map(|i| format!("y_{}", i)));
        let header: Vec<String> =
            rdr.headers().unwrap().iter().map(|h| h.to_string()).collect();
        assert_eq!(header, expected);

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 5);
        let simulations =
            simulate_from_prior(&simulate.problem, 5, Seed::new(26), true).unwrap();
        for (row, (par, data)) in rows.iter().zip(simulations.iter()) {
            assert_eq!(row.len(), expected.len());
            let p0: f64 = row[0].parse().unwrap();
            assert!((p0 - par.values()[0]).abs() < 1e-5);
            let y0: f64 = row[1].parse().unwrap();
            assert!((y0 - data.flatten()[0]).abs() < 1e-5);
        }
        let seed = fs::read_to_string(dir.path().join("gaussian").join("seed.txt")).unwrap();
        assert_eq!(seed, "26,");
    }

    #[test]
    fn simulate_zero_runs_fails() {
        let dir = tempfile::tempdir().unwrap();
        let simulate = Simulate {
            problem: GaussianErrorProblem::default().into(),
            runs: 0,
            seed: Seed::default(),
            path2dir: dir.path().to_path_buf(),
            gzip: false,
            sequential: true,
            verbosity: 0,
        };
        assert!(simulate.run().is_err());
    }

    #[test]
    fn calibrate_one_weight_per_statistic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let problem: AnyProblem = GaussianErrorProblem::default().into();
        let n_stats = problem.get_obs().unwrap().flatten().len();
        Calibrate {
            problem,
            distance: "Calibrated__Euclidean__mad".parse().unwrap(),
            samples: 50,
            seed: Seed::new(26),
            path: Some(path.clone()),
            sequential: true,
            verbosity: 0,
        }
        .run()
        .unwrap();

        let calibration: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(calibration["id"], "gaussian_2");
        assert_eq!(calibration["distance"], "Calibrated__Euclidean__mad");
        assert_eq!(calibration["samples"], 50);
        let weights = calibration["weights"].as_object().unwrap();
        assert_eq!(weights.len(), n_stats);
        assert_eq!(n_stats, GaussianErrorProblem::N_Y);
        assert!(weights.contains_key("y_0"));
        assert!(weights.values().all(|w| w.as_f64().unwrap() >= 0.));
        assert!(calibration["median_distance"].as_f64().unwrap().is_finite());
    }
}
