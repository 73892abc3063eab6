//! Log setup for the service.
//!
//! Compact timestamped lines on stderr. `RUST_LOG` takes precedence over the
//! level chosen on the command line:
//!
//! ```bash
//! RUST_LOG=duplexify=debug duplexify --watch-dir /srv/scans
//! ```

use std::sync::Once;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

static INIT: Once = Once::new();

/// Compact time format: YYYY-MM-DD HH:MM:SS.mmm
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Map a `-q` / `-v` count to a filter directive.
pub fn level_for(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize logging. Only the first call takes effect.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(default_level)
        };

        // A subscriber installed by the host process wins.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTime)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
