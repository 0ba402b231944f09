// Logging bootstrap for the pool's diagnostic channel.
//
// The library itself only emits `tracing` events (configuration refusals,
// queue overflow, worker lifecycle); embedding applications that already
// install a subscriber need nothing from this module. Binaries and tests
// can opt in to a formatted subscriber here.

use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*, registry::Registry};

/// Configuration for the diagnostic output.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to display.
    pub level: Level,
    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
    /// Include the worker thread name in each line.
    pub show_thread_info: bool,
    /// Target filter expressions (format: "target=level,target2=level2").
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_thread_info: true,
            target_filters: None,
        }
    }
}

// The global subscriber can only be installed once per process.
static INIT: Once = Once::new();

/// Install a global subscriber with the given configuration.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

        if let Some(filters) = config.target_filters {
            for filter in filters.split(',') {
                if let Ok(directive) = filter.parse() {
                    env_filter = env_filter.add_directive(directive);
                }
            }
        }

        if config.json_format {
            set_global_subscriber(
                Registry::default()
                    .with(env_filter)
                    .with(fmt::layer().json().flatten_event(true)),
            );
        } else {
            set_global_subscriber(
                Registry::default().with(env_filter).with(
                    fmt::layer()
                        .with_ansi(atty::is(atty::Stream::Stdout))
                        .with_thread_names(config.show_thread_info),
                ),
            );
        }
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("error setting global tracing subscriber: {err}");
    }
}

/// Install a global subscriber with the default configuration.
pub fn init_default() {
    init(LogConfig::default());
}

/// Quiet configuration for test runs: warnings and errors only, no thread
/// names.
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_thread_info: false,
        target_filters: None,
    });
}
