//! Logging setup.
//!
//! Records are `timestamp - LEVEL message` lines on stderr. `RUST_LOG` takes
//! precedence over the configured level:
//!
//! ```bash
//! RUST_LOG=debug autosort ~/Downloads
//! RUST_LOG=autosort::watcher=trace autosort ~/Downloads
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Timestamp format: `YYYY-MM-DD HH:MM:SS` in local time.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Initialize logging at `level` (`error`, `warn`, `info`, `debug`, `trace`,
/// or any `EnvFilter` directive string).
///
/// Only the first call takes effect. An unparsable level falls back to `info`.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(LocalTime)
            .with_level(true)
            .with_filter(filter);

        // a subscriber installed by an embedding program wins
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}
