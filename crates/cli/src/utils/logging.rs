use tracing_subscriber::EnvFilter;

/// Install the `tracing-subscriber` formatter, honoring `--verbose`/`--quiet`
/// over the configured log level.
pub fn init_logging(configured_level: &str, verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        configured_level
    };

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
