use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "WALLTEXT_LOG";
const LOG_DIRECTORY_NAME: &str = "logs";
const LOG_FILE_NAME: &str = "walltext.log";

pub struct WallTextTracing;

impl WallTextTracing {
    /// Logs to stderr and to a daily file in `<data>/logs`.
    /// Keep the returned guard alive until exit or the last lines never reach the file.
    pub fn install_tracing(data_path: &Path) -> Result<WorkerGuard> {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let file_appender =
            tracing_appender::rolling::daily(data_path.join(LOG_DIRECTORY_NAME), LOG_FILE_NAME);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .try_init()
            .into_diagnostic()
            .wrap_err("failed to install tracing subscriber")?;
        Ok(guard)
    }
}
