use chrono::Utc;
use clap_app::Cli;

mod app;
mod clap_app;

fn main() {
    match Cli::build() {
        Ok(command) => {
            // stdout is kept for the output of the commands
            eprintln!("{} Starting", Utc::now());
            std::process::exit({
                match command.run() {
                    Ok(()) => {
                        eprintln!("{} End", Utc::now());
                        0
                    }
                    Err(err) => {
                        eprintln!("{} Error: {:?}", Utc::now(), err);
                        1
                    }
                }
            });
        }
        Err(err) => {
            eprintln!("{} Error while building the cli: {:?}", Utc::now(), err);
            std::process::exit(1);
        }
    }
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;

    Cli::command().debug_assert()
}
