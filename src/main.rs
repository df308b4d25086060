use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use zprobe::{init_logging, run_survey, Config, GridPlanner, LogFormat, BUILD_DATE, VERSION};

const PKG_DESCRIPTION: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " - grid surface probing for grblHAL controllers"
);

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file (.toml or .json)
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the default configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Print the planned G-code program and exit without connecting
    #[arg(long = "dry-run")]
    dry_run: bool,
    /// Controller hostname or IP address
    #[arg(short = 'H', long = "host")]
    host: Option<String>,
    /// Controller TCP port
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    /// Directory the heightmap is written to
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<PathBuf>,
    /// Log as JSON lines
    #[arg(long = "json-logs")]
    json_logs: bool,
}

impl Cli {
    /// Apply command line values on top of `config`
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(dir) = &self.output {
            config.output.directory = dir.clone();
        }
    }
}

/// Config file from `--config`, else the default location if it exists, else defaults
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => match Config::default_path() {
            Ok(path) if path.exists() => Config::load_from_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            _ => Config::default(),
        },
    };

    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.print_config {
        print!("{}", Config::default().to_toml_string()?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    if cli.dry_run {
        print!("{}", GridPlanner::new(config.grid.clone()).to_gcode());
        return Ok(ExitCode::SUCCESS);
    }

    info!("zprobe {} (built {})", VERSION, BUILD_DATE);
    let report = run_survey(&config).await?;

    info!(
        "Session {} {}: {} samples, {} commands sent",
        report.session_id,
        report.outcome,
        report.results.len(),
        report.commands_sent
    );
    if let Some(reason) = &report.persistence_error {
        error!("Heightmap was not saved: {}", reason);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(format)?;

    run(cli).await
}
