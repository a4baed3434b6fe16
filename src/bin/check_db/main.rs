//! Print the total number of samples of a run database, to e.g. check the
//! analysis terminated correctly.
use anyhow::Context;
use clap::{ArgAction, Parser};
use slad_history::History;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "check_db", version)]
#[command(about = "Print the total number of samples of an ABC-SMC run database")]
struct Cli {
    /// The SQLite database of the run, never created when missing
    #[arg(long, value_name = "FILE")]
    db: PathBuf,
    /// Print the generations of the run
    #[arg(short, long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,
}

fn total_samples(db: &Path, verbosity: u8) -> anyhow::Result<u64> {
    let history = History::open(db)?;
    if verbosity > 0 {
        for population in history.all_populations()? {
            println!("{:?}", population);
        }
    }
    history
        .total_samples()
        .with_context(|| format!("Cannot count the samples of {:#?}", db))
}

fn main() {
    let cli = Cli::parse();
    match total_samples(&cli.db, cli.verbose) {
        Ok(samples) => println!("{}", samples),
        Err(err) => {
            eprintln!("Error: {:?}", err);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slad_history::fixture::{write_history, Generation};

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;

        Cli::command().debug_assert()
    }

    #[test]
    fn sums_samples_of_all_generations() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db_Adaptive__Euclidean__mad.db");
        write_history(
            &db,
            &[
                Generation::new(-1, 1000, f64::INFINITY),
                Generation::new(0, 2500, 3.).with_particle(1., &[("p0", 1.)]),
            ],
        )
        .unwrap();
        assert_eq!(total_samples(&db, 0).unwrap(), 3500);
    }

    #[test]
    fn missing_db_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db.db");
        assert!(total_samples(&db, 0).is_err());
        assert!(!db.exists());
    }
}
