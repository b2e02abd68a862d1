use env_logger::{Builder, Env};
use log::LevelFilter;

/// Picks the default log level from the quiet/verbose switches.
///
/// Quiet wins over verbose, the same way the summary output is suppressed
/// whenever `--quiet` is given.
pub fn level_for(quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger. `RUST_LOG` overrides the level chosen here.
pub fn init(quiet: bool, verbose: bool) {
    let default = level_for(quiet, verbose).to_string().to_lowercase();
    let mut builder = Builder::from_env(Env::default().default_filter_or(default));
    builder.format_timestamp(None).format_target(false);

    // A second call (tests, embedding) keeps the logger that is already there.
    let _ = builder.try_init();
}
