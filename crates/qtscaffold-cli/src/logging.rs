// Logging and verbosity control

use tracing_subscriber::EnvFilter;

/// Verbosity levels selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    /// Errors only
    Quiet,
    /// Configured level
    Normal,
    /// Debug output
    Verbose,
}

impl VerbosityLevel {
    /// Pick the level from the global flags; `--quiet` wins over `--verbose`
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Filter directive for this level
    pub fn filter<'a>(&self, configured: &'a str) -> &'a str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Verbose => "debug",
            VerbosityLevel::Normal => configured,
        }
    }
}

/// Initialize logging based on CLI flags and the configured level
///
/// `RUST_LOG` overrides both. Logs go to stderr so rendered output on
/// stdout stays clean.
pub fn init_logging(level: VerbosityLevel, configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter(configured)));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(VerbosityLevel::from_flags(true, true), VerbosityLevel::Quiet);
        assert_eq!(VerbosityLevel::from_flags(true, false), VerbosityLevel::Verbose);
        assert_eq!(VerbosityLevel::from_flags(false, false), VerbosityLevel::Normal);
    }

    #[test]
    fn test_filter_uses_configured_level_when_normal() {
        assert_eq!(VerbosityLevel::Normal.filter("warn"), "warn");
        assert_eq!(VerbosityLevel::Verbose.filter("warn"), "debug");
        assert_eq!(VerbosityLevel::Quiet.filter("warn"), "error");
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(VerbosityLevel::Quiet, "info");
        init_logging(VerbosityLevel::Verbose, "info");
    }
}
