//! Tracing subscriber setup.
//!
//! | Flag(s)  | Level |
//! |----------|-------|
//! | (none)   | WARN  |
//! | `-v`     | INFO  |
//! | `-vv`    | DEBUG |
//! | `-vvv`   | TRACE |
//! | `-q`     | ERROR |
//!
//! `RUST_LOG` overrides the flags when set. Logs go to stderr so that
//! `--json` output on stdout stays clean.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::GlobalArgs;

pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let level = level_for(args);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("boq={level},boq_core={level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn level_for(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(verbose: u8, quiet: bool) -> GlobalArgs {
        GlobalArgs {
            verbose,
            quiet,
            user: None,
        }
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for(&args(0, false)), "warn");
        assert_eq!(level_for(&args(1, false)), "info");
        assert_eq!(level_for(&args(2, false)), "debug");
        assert_eq!(level_for(&args(7, false)), "trace");
    }

    #[test]
    fn test_quiet_wins() {
        assert_eq!(level_for(&args(3, true)), "error");
    }
}
