#[cfg(feature = "telemetry")]
use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the stderr tracing subscriber once per process.
///
/// `RUST_LOG` overrides the default `vb_lint=info` filter.
#[cfg(feature = "telemetry")]
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vb_lint=info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing() {}

/// Run `$block` inside an `info` span tagged with `phase = $name` when telemetry is enabled.
#[macro_export]
macro_rules! instrument_block {
    ($name:expr, $block:block) => {{
        #[cfg(feature = "telemetry")]
        {
            let span = tracing::info_span!("vb_lint", phase = $name);
            let _guard = span.enter();
            (|| $block)()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            (|| $block)()
        }
    }};
}
