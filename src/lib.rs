//! # zprobe
//!
//! Automated surface probing for networked grblHAL CNC controllers.
//!
//! ## Architecture
//!
//! zprobe is organized as a workspace with multiple crates:
//!
//! 1. **zprobe-core** - Grid configuration, commands, samples, heightmap output, errors
//! 2. **zprobe-camtools** - Serpentine probe grid planner
//! 3. **zprobe-communication** - TCP transport, grblHAL protocol, streaming session
//! 4. **zprobe-settings** - Configuration file handling
//! 5. **zprobe** - Command-line binary that wires them together
//!
//! A survey connects to the controller, resets and unlocks it, then streams
//! one probe cycle per grid point and records the touch-off height of each.

pub use zprobe_camtools::{GridPlanner, GridPoint};
pub use zprobe_communication::{
    ConnectionParams, ProbeSession, SessionOptions, SessionOutcome, SessionReport, TcpTransport,
};
pub use zprobe_core::{
    Command, CommandIntent, CsvHeightmapWriter, Error, GridConfig, GridCoverage, HeightmapSink,
    ProbeSample, Result, ResultSet,
};
pub use zprobe_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout stays free for G-code and config dumps
/// - RUST_LOG environment variable support (default INFO)
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}

/// Connect to the controller and run one survey with `config`.
///
/// The heightmap is written to [`Config::output_path`]. Connection failures
/// are returned as errors; everything after the connection is established
/// ends up in the returned report.
pub async fn run_survey(config: &Config) -> anyhow::Result<SessionReport> {
    use anyhow::Context;

    let params = config.connection_params();
    let transport = TcpTransport::connect(&params)
        .await
        .with_context(|| format!("could not connect to {}", params.connect_addr()))?;

    let sink = CsvHeightmapWriter::new(config.output_path(&config.grid.coverage()));
    let session = ProbeSession::new(
        config.grid.clone(),
        config.session_options(),
        Box::new(transport),
    )?;

    Ok(session.run(&sink).await)
}
