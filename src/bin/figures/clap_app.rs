use clap::{ArgAction, Parser, ValueEnum};
use slad::analysis::RunLayout;
use slad::constants::FIGURES_DIR;
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Figure {
    Ess,
    Rmse,
    Calibration,
}

impl Figure {
    pub const ALL: [Figure; 3] = [Figure::Ess, Figure::Rmse, Figure::Calibration];
}

#[derive(Debug, Parser)]
#[command(name = "figures", version)]
#[command(
    about = "Plot the effective sample size, the RMSE and the calibration of the ABC-SMC runs",
    long_about = "Read the last generation of all the ABC-SMC runs, aggregate the metrics across the repetitions for each problem, distance and regime and plot them. The aggregated tables are saved next to the figures"
)]
pub struct Cli {
    /// Use the runs with the histogram-based data
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    hist: u8,
    /// Plot only this figure
    #[arg(long, value_enum)]
    figure: Option<Figure>,
    /// Directory of the runs, overriding the default one
    #[arg(long, value_name = "DIR", value_parser = |path: &str| { let path_b = PathBuf::from(path); if path_b.is_dir() { Ok(path_b) } else { Err("Cannot find dir") }})]
    data_dir: Option<PathBuf>,
    /// Number of repetitions, overriding the default one
    #[arg(long)]
    n_rep: Option<usize>,
    /// Directory to store the figures
    #[arg(long, value_name = "DIR", default_value = FIGURES_DIR)]
    out_dir: PathBuf,
    #[arg(short, long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,
}

pub struct Figures {
    pub layout: RunLayout,
    pub figures: Vec<Figure>,
    pub out_dir: PathBuf,
    /// Appended to the name of the figures
    pub suffix: &'static str,
    pub verbosity: u8,
}

impl Cli {
    pub fn build() -> Figures {
        let args = Cli::parse();
        let hist = args.hist == 1;
        let mut layout = RunLayout::with_hist(hist);
        if let Some(data_dir) = args.data_dir {
            layout.data_dir = data_dir;
        }
        if let Some(n_rep) = args.n_rep {
            layout.n_rep = n_rep;
        }
        Figures {
            layout,
            figures: args.figure.map_or_else(|| Figure::ALL.to_vec(), |f| vec![f]),
            out_dir: args.out_dir,
            suffix: if hist { "_hist" } else { "" },
            verbosity: args.verbose,
        }
    }
}
