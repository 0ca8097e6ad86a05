//! Logging configuration for sentri-guard.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. [`setup::init_logging`] is what the `sentri` binary uses.

/// Controls how much the check engine logs.
///
/// A `LogConfig` is handed to the [`CheckManager`](crate::core::CheckManager)
/// and threaded into every check run; there is no global logger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Emit a debug event for every record a column produces
    pub log_column_results: bool,
    /// Emit a debug event when a column slice is filtered
    pub log_slicing: bool,
    /// Warn when one check type runs longer than this many milliseconds
    pub slow_check_ms: Option<u64>,
    /// Maximum length for logged field values such as filter predicates
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_column_results: false,
            log_slicing: true,
            slow_check_ms: Some(30_000),
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Everything on, long predicates kept intact.
    pub fn debugging() -> Self {
        Self {
            log_column_results: true,
            log_slicing: true,
            slow_check_ms: Some(1_000),
            max_field_length: 1024,
        }
    }

    /// Only warnings from the manager.
    pub fn quiet() -> Self {
        Self {
            log_column_results: false,
            log_slicing: false,
            slow_check_ms: None,
            max_field_length: 128,
        }
    }

    /// Whether a check type that took `elapsed_ms` deserves a warning.
    pub fn is_slow(&self, elapsed_ms: u64) -> bool {
        self.slow_check_ms.is_some_and(|limit| elapsed_ms > limit)
    }
}

/// Debug event emitted only when per-column results are enabled.
#[macro_export]
macro_rules! log_column {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_column_results {
            tracing::debug!($($arg)*);
        }
    };
}

/// Debug event emitted only when slice preparation logging is enabled.
#[macro_export]
macro_rules! log_slice {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_slicing {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes on a character boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup for applications embedding the engine.
pub mod setup {
    use tracing::Level;

    /// Configuration for the process-wide tracing subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level applied to every other crate (DataFusion, tokio, ...)
        pub dependency_level: Level,
        /// Level for the engine and the `sentri` binary
        pub engine_level: Level,
        pub json: bool,
        /// Full `EnvFilter` directive replacing the computed one
        pub directive: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                dependency_level: Level::WARN,
                engine_level: Level::INFO,
                json: false,
                directive: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON lines for log collectors.
        pub fn production() -> Self {
            Self {
                json: true,
                ..Self::default()
            }
        }

        pub fn development() -> Self {
            Self {
                dependency_level: Level::INFO,
                engine_level: Level::DEBUG,
                ..Self::default()
            }
        }

        pub fn with_engine_level(mut self, level: Level) -> Self {
            self.engine_level = level;
            self
        }

        pub fn with_json(mut self, enabled: bool) -> Self {
            self.json = enabled;
            self
        }

        pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
            self.directive = Some(directive.into());
            self
        }

        /// The `EnvFilter` directive this configuration installs.
        pub fn directive(&self) -> String {
            match &self.directive {
                Some(directive) => directive.clone(),
                None => {
                    let engine = self.engine_level.as_str().to_lowercase();
                    format!(
                        "{},sentri_guard={engine},sentri={engine}",
                        self.dependency_level.as_str().to_lowercase()
                    )
                }
            }
        }
    }

    /// Installs a global `tracing` subscriber writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the configured directive.
    ///
    /// ```rust,no_run
    /// use sentri_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directive()));

        let fmt_layer = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
