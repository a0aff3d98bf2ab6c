use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Verbosity follows `RUST_LOG`, `info` by default.
pub fn init_logging() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env()?)
        .try_init()?;
    Ok(())
}
