use clap::Parser;
use stockpick::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
