use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `verbose` forces debug and the configured
/// level applies.
fn filter(level: &str, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { level };
        EnvFilter::try_new(format!("recruit={level}")).unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}

pub fn init_stderr(level: &str, verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level, verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Full-screen mode owns the terminal, so logs go to a file instead. Keep
/// the returned guard alive until the screen closes or buffered lines are
/// lost.
pub fn init_file(dir: &Path, level: &str, verbose: bool) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, "recruit.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level, verbose))
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(guard)
}
