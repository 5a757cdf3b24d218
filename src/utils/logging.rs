//! Tracing setup for the journal. Records always land in rotating files next to the journal
//! documents, the console only sees them when asked for.

use std::{path::Path, sync::LazyLock};

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const LOG_FILE_PREFIX: &str = "habit-journal";
const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;
const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy)]
pub struct LogOptions<'a> {
    /// Journal directory, logs go into its `logs` folder.
    pub dir: &'a Path,
    pub level: Option<LevelFilter>,
    /// Mirror records to stderr. Stdout is reserved for command output.
    pub console: bool,
}

/// Builds the filter directive. An explicit level only applies to this crate and beats
/// `RUST_LOG`. A `RUST_LOG` with its own targets is used as is.
fn filter_directive(level: Option<LevelFilter>, rust_log: Option<&str>) -> String {
    let target = env!("CARGO_PKG_NAME").replace('-', "_");
    match (level, rust_log.map(str::trim).filter(|v| !v.is_empty())) {
        (Some(level), _) => format!("{target}={}", level.to_string().to_lowercase()),
        (None, Some(env)) if env.contains('=') => env.to_string(),
        (None, Some(env)) => format!("{target}={env}"),
        (None, None) => format!("{target}={DEFAULT_LEVEL}"),
    }
}

pub fn enable_logging(options: LogOptions) -> Result<()> {
    let files = Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(options.dir.join(LOG_DIR))?;

    let directive = filter_directive(options.level, std::env::var("RUST_LOG").ok().as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("Invalid log filter {directive:?}: {e}"))?;

    let console = options.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .pretty()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(files)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(console)
        .try_init()
        .map_err(|e| anyhow!("Logging is already set up: {e}"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .try_init();
});
