//! Process-wide logging setup.

pub mod logging;

pub use logging::{LogFormat, LogSettings};

/// Initialize logging with JSON output and `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    logging::init(&LogSettings::default());
}

/// Initialize logging from explicit settings. `RUST_LOG` still wins when set.
pub fn init_with(settings: &LogSettings) {
    logging::init(settings);
}
