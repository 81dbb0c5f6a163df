//! Logging utilities and configuration for fairlens.
//!
//! Library code only emits `tracing` events. Binaries decide where they go by
//! calling [`setup::init_logging`] once at startup.

use tracing::Level;

/// Controls how much detail fairlens components log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for fairlens components
    pub base_level: Level,
    /// Whether to log per-column profiling decisions
    pub log_column_details: bool,
    /// Whether to log backend response bodies
    pub log_backend_bodies: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_column_details: false,
            log_backend_bodies: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_column_details: true,
            log_backend_bodies: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration that only reports warnings.
    pub fn quiet() -> Self {
        Self {
            base_level: Level::WARN,
            log_column_details: false,
            log_backend_bodies: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Truncates `value` to this configuration's field limit.
    pub fn truncate<'a>(&self, value: &'a str) -> std::borrow::Cow<'a, str> {
        if value.len() <= self.max_field_length {
            std::borrow::Cow::Borrowed(value)
        } else {
            std::borrow::Cow::Owned(truncate_field(value, self.max_field_length))
        }
    }
}

/// Truncates a string to at most `max_length` bytes, on a char boundary.
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

/// Subscriber installation for binaries and tests.
pub mod setup {
    use tracing::Level;

    use super::LogConfig;
    use crate::error::{FairlensError, Result};

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything outside fairlens
        pub level: Level,
        /// Log level for fairlens crates
        pub fairlens_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                fairlens_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl From<&LogConfig> for LoggingConfig {
        fn from(config: &LogConfig) -> Self {
            Self {
                fairlens_level: config.base_level,
                ..Self::default()
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::INFO,
                fairlens_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Creates a configuration emitting JSON lines.
        pub fn structured() -> Self {
            Self {
                json_format: true,
                ..Self::default()
            }
        }

        /// Sets the log level for everything outside fairlens.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for fairlens crates.
        pub fn with_fairlens_level(mut self, level: Level) -> Self {
            self.fairlens_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                let fairlens = self.fairlens_level.as_str().to_lowercase();
                format!(
                    "{},fairlens={fairlens},fairlens_cli={fairlens}",
                    self.level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs the global subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use fairlens::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::Configuration`] if a global subscriber is
    /// already installed.
    pub fn init_logging(config: LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| FairlensError::Configuration(format!("Failed to initialize logging: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let default = LogConfig::default();
        assert_eq!(default.base_level, Level::INFO);
        assert!(!default.log_backend_bodies);
        assert_eq!(default.max_field_length, 256);

        let verbose = LogConfig::verbose();
        assert_eq!(verbose.base_level, Level::DEBUG);
        assert!(verbose.log_column_details);
        assert_eq!(verbose.max_field_length, 1024);

        assert_eq!(LogConfig::quiet().base_level, Level::WARN);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        // never splits a multi-byte character
        assert_eq!(truncate_field("ééé", 3), "é...(truncated)");
    }

    #[test]
    fn test_env_filter_string() {
        let config = LoggingConfig::from(&LogConfig::verbose());
        assert_eq!(
            config.env_filter(),
            "warn,fairlens=debug,fairlens_cli=debug"
        );
        let custom = LoggingConfig::default().with_env_filter("trace");
        assert_eq!(custom.env_filter(), "trace");
    }
}
