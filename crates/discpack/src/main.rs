//! discpack command-line interface

use clap::{Parser, Subcommand};
use discpack_logging::{init_logging, LogConfig, Verbosity};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(
    name = "discpack",
    version,
    about = "Resolve a music collection into numbered record tracks"
)]
struct Cli {
    /// Print debug messages to the console
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print messages to the console if there's a problem
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to $DISCPACK_HOME/config.toml)
    #[arg(long, global = true, env = "DISCPACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve input files into numbered tracks
    Plan(cli::plan::PlanArgs),
    /// Validate a spec file
    Check(cli::check::CheckArgs),
    /// Show configuration paths and resolved options
    Config(cli::config::ConfigArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Plan(args) => args.json,
        Commands::Check(args) => args.json,
        Commands::Config(args) => args.json,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    if let Err(err) = init_logging(LogConfig {
        app_name: "discpack",
        verbosity,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    let json_mode = command_wants_json(&cli.command);
    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Plan(args) => cli::plan::run(args, config_path),
        Commands::Check(args) => cli::check::run(args, config_path),
        Commands::Config(args) => cli::config::run(args, config_path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else if let Some(helpful) = err.downcast_ref::<cli::error::HelpfulError>() {
                eprint!("{}", helpful);
            } else {
                eprintln!("ERROR: {:#}", err);
            }
            ExitCode::from(1)
        }
    }
}
