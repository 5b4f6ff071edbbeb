//! Logging initialization

/// Initialize tracing output to stderr.
///
/// The default filter is `info`, raised to `debug` by the CLI flag; a
/// `RUST_LOG` value overrides both.
pub fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}
