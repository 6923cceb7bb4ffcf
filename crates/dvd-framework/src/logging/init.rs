use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` uses `env_logger` filter syntax, e.g. `"info"` or
/// `"dvd_app=debug,wgpu_core=warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Default level becomes `debug` instead of `info`.
    pub debug: bool,
}

impl LoggingConfig {
    pub fn with_debug(debug: bool) -> Self {
        Self { debug, ..Self::default() }
    }

    fn default_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            debug: false,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger. Later calls are ignored.
///
/// Filter precedence: `config.env_filter`, then `RUST_LOG`, then the default level.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match resolve_filter(&config, std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(config.default_level());
                // wgpu is chatty at debug level.
                builder.filter_module("wgpu_core", log::LevelFilter::Warn);
                builder.filter_module("wgpu_hal", log::LevelFilter::Warn);
                builder.filter_module("naga", log::LevelFilter::Warn);
            }
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized");
    });
}

fn resolve_filter(config: &LoggingConfig, rust_log: Option<String>) -> Option<String> {
    config.env_filter.clone().or(rust_log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_beats_rust_log() {
        let cfg = LoggingConfig {
            env_filter: Some("warn".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(resolve_filter(&cfg, Some("trace".into())).as_deref(), Some("warn"));
    }

    #[test]
    fn rust_log_used_when_no_explicit_filter() {
        let cfg = LoggingConfig::default();
        assert_eq!(resolve_filter(&cfg, Some("trace".into())).as_deref(), Some("trace"));
        assert_eq!(resolve_filter(&cfg, None), None);
    }

    #[test]
    fn debug_flag_lowers_default_level() {
        assert_eq!(LoggingConfig::default().default_level(), log::LevelFilter::Info);
        assert_eq!(LoggingConfig::with_debug(true).default_level(), log::LevelFilter::Debug);
    }
}
