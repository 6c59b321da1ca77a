use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{
    format::FmtSpan,
    writer::{BoxMakeWriter, MakeWriterExt},
};

pub const CLI_PREFIX: &str = "cli";

const KEPT_LOG_FILES: usize = 5;

/// Sets up the global subscriber.
///
/// With a `log_dir` events go to a daily rotated `<prefix>` file inside it. Without one nothing
/// is written to disk, which is what one-shot `--json` commands use. `show_std` mirrors events
/// to stderr so they never interleave with command output on stdout.
pub fn enable_logging(
    prefix: &str,
    log_dir: Option<&Path>,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let stderr = std::io::stderr.with_filter(move |_| show_std);
    let writer = match log_dir {
        Some(dir) => BoxMakeWriter::new(stderr.and(daily_appender(prefix, dir)?)),
        None => BoxMakeWriter::new(stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_directive(
            log_level,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer)
        .with_ansi(false)
        .pretty()
        .init();
    Ok(())
}

fn daily_appender(prefix: &str, dir: &Path) -> Result<RollingFileAppender> {
    Ok(tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .build(dir)?)
}

/// Only this crate's events pass. An explicit level wins over `RUST_LOG`, and `debug` is the
/// fallback.
fn filter_directive(log_level: Option<LevelFilter>, rust_log: Option<String>) -> String {
    let level = log_level
        .map(|v| v.to_string())
        .or(rust_log)
        .unwrap_or_else(|| "debug".into());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
