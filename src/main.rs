use std::process::ExitCode;

use clap::Parser;
use pixelpattern::settings::EngineSettings;
use pixelpattern::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init(args.verbose, &EngineSettings::load());

    cli::run(args)
}
