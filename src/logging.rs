//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{LeakError, Result};

/// Installs a formatting subscriber filtered by `filter`, e.g. `"leakscope=debug"`.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(filter: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(filter)
                .map_err(|e| LeakError::InvalidArgument(format!("invalid log filter: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| LeakError::InvalidArgument("logging already initialized".into()))
}
