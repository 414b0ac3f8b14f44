use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding `EnvFilter` directives, e.g. `LGS_LOG=league_stats_core=debug`.
pub const LOG_ENV: &str = "LGS_LOG";

/// Installs the global subscriber. Logs go to stderr so stdout stays machine-readable.
pub fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to initialise logging: {err}"))
}
