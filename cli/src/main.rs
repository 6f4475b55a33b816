mod config;
mod error;
mod query;
mod test_runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::term::termcolor::ColorChoice;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::CliError;
use query::QueryArgs;

#[derive(Parser)]
#[command(name = "drill", version, about = "Drill into documents and directories")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Raise the log level (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file [default: ./drill.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the fragment at a path of names and positions
    Query(QueryArgs),

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match execute(&cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    }
}

fn execute(cli: &Cli) -> Result<i32, CliError> {
    match &cli.command {
        Command::Query(args) => {
            let config = Config::load(cli.config.as_deref())?;
            let color = if cli.no_color {
                ColorChoice::Never
            } else {
                ColorChoice::Auto
            };
            query::run(args, &config, color)
        }
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                return Ok(0);
            }
            Ok(test_runner::run_tests(
                &args.path,
                cli.no_color,
                &args.category,
            ))
        }
    }
}

/// Logs go to stderr. `RUST_LOG` overrides the level chosen by `-v`.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
