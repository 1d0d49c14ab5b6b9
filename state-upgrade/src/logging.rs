use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Diagnostics go to stderr so stdout stays
/// parseable.
///
/// `RUST_LOG` wins over `filter`; `verbose` raises this crate to debug.
pub fn init(verbose: bool, filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{filter},state_upgrade=debug"))
        } else {
            EnvFilter::new(filter)
        }
    });

    // An already installed subscriber is kept.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
