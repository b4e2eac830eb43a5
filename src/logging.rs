use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const FILE_RETENTION_DAYS: usize = 30;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

/// Human-readable lines on stdout, plus a daily-rolling JSON file when
/// `enable_file_logs` is set. `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stdout = fmt::layer().with_target(true).with_thread_ids(false);
    let base = Registry::default().with(filter).with(stdout);

    let result = if config.enable_file_logs {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("crm-backend")
            .filename_suffix("log")
            .max_log_files(FILE_RETENTION_DAYS)
            .build(&config.log_dir)
            .expect("Failed to create rolling file appender");
        let file = fmt::layer().with_writer(appender).with_ansi(false).json();
        base.with(file).try_init()
    } else {
        base.try_init()
    };

    // A subscriber may already be installed (each test binary calls this
    // once per test); anything else is a broken config, so stop.
    if let Err(e) = result {
        if !e.to_string().contains("already been set") {
            panic!("Failed to initialize tracing: {e}");
        }
    }
}
