use crate::app::{Calibrate, Info, Obs, Run, Simulate, Status};
use clap::{ArgAction, Parser, Subcommand};
use slad::analysis::RunLayout;
use slad::problem::{ProblemType, Regime};
use slad::DistanceName;
use slad_sim::Seed;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "slad", version)]
#[command(
    about = "Test problems to benchmark the robustness of ABC distances to outliers",
    long_about = "Inspect the test problems whose observed data is corrupted by outliers, generate their observed data, simulate reference tables from the prior, calibrate the distances and check which runs of the ABC-SMC sampler are available"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn regime(outlier_free: bool) -> Regime {
    if outlier_free {
        Regime::OutlierFree
    } else {
        Regime::Corrupted
    }
}

impl Cli {
    pub fn build() -> anyhow::Result<Box<dyn Run>> {
        let args = Cli::parse();

        match args.command {
            Commands::Info { problem, outlier_free } => {
                Ok(Box::new(Info { problem: problem.build(regime(outlier_free))? }))
            }
            Commands::Obs { problem, outlier_free, path, verbose } => Ok(Box::new(Obs {
                problem: problem.build(regime(outlier_free))?,
                path,
                verbosity: verbose,
            })),
            Commands::Simulate {
                problem,
                outlier_free,
                runs,
                seed,
                gzip,
                sequential,
                path,
                debug,
                verbose,
            } => {
                let runs = if debug { 1 } else { runs };
                let verbosity = if debug { u8::MAX } else { verbose };
                Ok(Box::new(Simulate {
                    problem: problem.build(regime(outlier_free))?,
                    runs,
                    seed: Seed::new(seed),
                    path2dir: path,
                    gzip,
                    sequential: sequential || debug,
                    verbosity,
                }))
            }
            Commands::Calibrate {
                problem,
                outlier_free,
                distance,
                samples,
                seed,
                sequential,
                path,
                verbose,
            } => Ok(Box::new(Calibrate {
                problem: problem.build(regime(outlier_free))?,
                distance,
                samples,
                seed: Seed::new(seed),
                path,
                sequential,
                verbosity: verbose,
            })),
            Commands::Status { problem, hist, data_dir, n_rep, verbose } => {
                let mut layout = RunLayout::with_hist(hist);
                if let Some(data_dir) = data_dir {
                    layout.data_dir = data_dir;
                }
                if let Some(n_rep) = n_rep {
                    layout.n_rep = n_rep;
                }
                let problems = match problem {
                    Some(problem) => vec![problem],
                    None => ProblemType::FIGURES.to_vec(),
                };
                Ok(Box::new(Status { layout, problems, verbosity: verbose }))
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the prior, the ground truth, the data keys and the errors of a
    /// problem as JSON
    Info {
        #[arg(value_enum)]
        problem: ProblemType,
        /// The problem without any outlier in the observed data
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        outlier_free: bool,
    },
    #[command(arg_required_else_help = true)]
    /// Generate the observed data with its outliers as JSON
    Obs {
        #[arg(value_enum)]
        problem: ProblemType,
        /// The problem without any outlier in the observed data
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        outlier_free: bool,
        /// Save to this JSON file instead of printing to stdout
        #[arg(long, value_name = "FILE", value_parser = |path: &str| { let path_b = PathBuf::from(path); if path_b.extension() == Some(std::ffi::OsStr::new("json")) { Ok(path_b) } else { Err("Must be JSON file: extension must be .json") }})]
        path: Option<PathBuf>,
        #[arg(short, long, action = ArgAction::Count, default_value_t = 0)]
        verbose: u8,
    },
    #[command(arg_required_else_help = true)]
    /// Simulate a reference table of parameters sampled from the prior and
    /// their data
    Simulate {
        #[arg(value_enum)]
        problem: ProblemType,
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        outlier_free: bool,
        /// Number of parameters sampled from the prior, at most 1000
        #[arg(short, long, default_value_t = 1000, conflicts_with = "debug")]
        runs: usize,
        /// Seed for reproducibility
        #[arg(long, default_value_t = 26)]
        seed: u64,
        /// Compress the table with gzip
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        gzip: bool,
        /// Run sequentially each run instead of using rayon for parallelisation
        #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false, conflicts_with = "debug")]
        sequential: bool,
        /// Triggers debug mode: max verbosity and 1 sequential simulation
        #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false)]
        debug: bool,
        /// Directory to store the reference table
        #[arg(value_name = "DIR", value_parser = |path: &str| { let path_b = PathBuf::from(path); if path_b.is_dir() { Ok(path_b) } else { Err("Cannot find dir") }})]
        path: PathBuf,
        #[arg(short, long, action = ArgAction::Count, conflicts_with = "debug", default_value_t = 0)]
        verbose: u8,
    },
    #[command(arg_required_else_help = true)]
    /// Compute the weights of a distance on a calibration sample from the
    /// prior
    Calibrate {
        #[arg(value_enum)]
        problem: ProblemType,
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        outlier_free: bool,
        /// The distance, e.g. `Adaptive__Euclidean__mad`
        #[arg(long, value_parser = |name: &str| name.parse::<DistanceName>().map_err(|e| e.to_string()))]
        distance: DistanceName,
        /// Size of the calibration sample, at most 1000
        #[arg(long, default_value_t = 1000)]
        samples: usize,
        #[arg(long, default_value_t = 26)]
        seed: u64,
        #[arg(short, long, action = ArgAction::SetTrue, default_value_t = false)]
        sequential: bool,
        /// Save to this JSON file instead of printing to stdout
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
        #[arg(short, long, action = ArgAction::Count, default_value_t = 0)]
        verbose: u8,
    },
    /// List the databases of the ABC-SMC runs found
    Status {
        /// Check only this problem instead of all those in the figures
        #[arg(long, value_enum)]
        problem: Option<ProblemType>,
        /// Runs using the histogram-based data
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        hist: bool,
        /// Directory of the runs, overriding the default one
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
        /// Number of repetitions, overriding the default one
        #[arg(long)]
        n_rep: Option<usize>,
        #[arg(short, long, action = ArgAction::Count, default_value_t = 0)]
        verbose: u8,
    },
}
