use std::sync::Once;

use log::LevelFilter;

/// Backend crates that are noisy below `warn`.
const QUIET_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives in `env_logger` syntax (e.g.
    /// "tessera_engine=debug,wgpu_core=warn"). Takes precedence over `RUST_LOG`.
    pub filter: Option<String>,

    /// Level applied when no directives are given; the wgpu backend crates
    /// are capped at `warn` in that case.
    pub default_level: LevelFilter,

    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            default_level: LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match directives(config.filter, std::env::var("RUST_LOG").ok()) {
            Some(directives) => {
                builder.parse_filters(&directives);
            }
            None => {
                builder.filter_level(config.default_level);
                for name in QUIET_CRATES {
                    builder.filter_module(name, config.default_level.min(LevelFilter::Warn));
                }
            }
        }
        builder.write_style(config.write_style);

        // Test harnesses may have installed a logger already.
        match builder.try_init() {
            Ok(()) => log::debug!("logging initialized"),
            Err(_) => log::debug!("logger already installed"),
        }
    });
}

/// Explicit directives win over the environment; blank strings count as unset.
fn directives(configured: Option<String>, env: Option<String>) -> Option<String> {
    configured
        .into_iter()
        .chain(env)
        .find(|d| !d.trim().is_empty())
}
