use anyhow::{anyhow, Context, Result};
use clap::Parser;
use scriptorium::build::build_site;
use scriptorium::config::{Config, LogLevel};
use scriptorium::feed::SystemClock;
use scriptorium::logger::configure_logger;
use std::path::PathBuf;

/// Builds a static blog from a directory of posts.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The project directory; `scriptorium.yaml` is searched for here and in
    /// its parents.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    project: PathBuf,

    /// Overrides the output directory from the project file.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Overrides the log level from the project file.
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_directory(&args.project)?;
    if let Some(output) = args.output {
        config.output_directory = output;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }

    configure_logger(config.log_level)
        .map_err(|e| anyhow!("Configuring the logger: {}", e))?;

    build_site(&config, &SystemClock).context("Building the site")?;
    Ok(())
}
