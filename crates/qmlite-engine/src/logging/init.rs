use std::sync::Once;

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

/// Log target of script-side `console.*` output.
pub const SCRIPT_TARGET: &str = "qml";

/// Logger configuration.
///
/// | field           | effect                                                  |
/// |-----------------|---------------------------------------------------------|
/// | `env_filter`    | `env_logger` filter string; `RUST_LOG` when `None`      |
/// | `default_level` | level for targets no filter mentions                    |
/// | `script_level`  | level of the `qml` target when no filter is given       |
/// | `timestamps`    | prefix records with a timestamp                         |
/// | `is_test`       | write through the test harness capture                  |
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: LevelFilter,
    pub script_level: LevelFilter,
    pub write_style: WriteStyle,
    pub timestamps: bool,
    pub is_test: bool,
}

impl LoggingConfig {
    /// Warnings and up, captured by the test harness, no timestamps.
    pub fn for_tests() -> Self {
        Self {
            default_level: LevelFilter::Warn,
            script_level: LevelFilter::Warn,
            timestamps: false,
            is_test: true,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.default_level = level;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: LevelFilter::Warn,
            script_level: LevelFilter::Info,
            write_style: WriteStyle::Auto,
            timestamps: true,
            is_test: false,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger on the first call; later calls do nothing.
///
/// An explicit filter (or `RUST_LOG`) replaces the per-target levels
/// entirely. Without one, engine diagnostics log at `default_level` and
/// document `console.*` output at `script_level`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = Builder::new();
        builder.filter_level(config.default_level);

        match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter(Some(SCRIPT_TARGET), config.script_level);
            }
        }

        builder.write_style(config.write_style).is_test(config.is_test);
        if !config.timestamps {
            builder.format_timestamp(None);
        }

        if builder.try_init().is_err() {
            log::debug!("a global logger was already installed");
        }
    });
}
