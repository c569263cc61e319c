//! Console logging for builds. Progress (`info` and below) goes to stdout;
//! warnings and errors go to stderr so they survive `> /dev/null`.

use std::sync::Arc;
use std::time::Duration;

use spdlog::sink::{StdStream, StdStreamSink};
use spdlog::{Level, LevelFilter, Logger};

use crate::config::LogLevel;

/// Buffered records are flushed at least this often during long builds.
const FLUSH_PERIOD: Duration = Duration::from_secs(1);

impl LogLevel {
    /// The least severe [`Level`] still logged.
    pub fn level(self) -> Level {
        match self {
            LogLevel::Critical => Level::Critical,
            LogLevel::Error => Level::Error,
            LogLevel::Warn => Level::Warn,
            LogLevel::Info => Level::Info,
            LogLevel::Debug => Level::Debug,
            LogLevel::Trace => Level::Trace,
        }
    }

    pub fn filter(self) -> LevelFilter {
        LevelFilter::MoreSevereEqual(self.level())
    }
}

fn console_sink(stream: StdStream, filter: LevelFilter) -> spdlog::Result<Arc<StdStreamSink>> {
    Ok(Arc::new(
        StdStreamSink::builder()
            .std_stream(stream)
            .level_filter(filter)
            .build()?,
    ))
}

/// Builds the console logger used by the `scriptorium` binary.
pub fn console_logger(level: LogLevel) -> spdlog::Result<Arc<Logger>> {
    let logger = Arc::new(
        Logger::builder()
            .sink(console_sink(
                StdStream::Stdout,
                LevelFilter::MoreVerbose(Level::Warn),
            )?)
            .sink(console_sink(
                StdStream::Stderr,
                LevelFilter::MoreSevereEqual(Level::Warn),
            )?)
            .level_filter(level.filter())
            .build()?,
    );
    logger.set_flush_level_filter(LevelFilter::MoreSevereEqual(Level::Warn));
    logger.set_flush_period(Some(FLUSH_PERIOD));
    Ok(logger)
}

/// Replaces the default logger with [`console_logger`].
pub fn configure_logger(level: LogLevel) -> spdlog::Result<()> {
    spdlog::set_default_logger(console_logger(level)?);
    Ok(())
}
