use anyhow::{Context, Result};
use std::fmt;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

const DEFAULT_CONSOLE_DIRECTIVE: &str = "model_eval=debug";

/// Level names as they appear in log lines; warnings are spelled `WARNING`.
fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// `<timestamp> - <logger-name> - <LEVEL> - <message>`
#[derive(Debug, Clone)]
pub struct LineFormat {
    logger_name: String,
}

impl LineFormat {
    pub fn new(logger_name: impl Into<String>) -> Self {
        Self {
            logger_name: logger_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - {} - ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            self.logger_name,
            level_name(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Build the logging context: a console layer filtered by `RUST_LOG` and an
/// error-log layer that only sees warnings and errors.
pub fn build_subscriber<C, F>(
    logger_name: &str,
    console: C,
    error_log: F,
) -> impl Subscriber + Send + Sync + 'static
where
    C: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    F: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_DIRECTIVE));

    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat::new(logger_name))
        .with_writer(console)
        .with_filter(console_filter);

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat::new(logger_name))
        .with_ansi(false)
        .with_writer(error_log)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
}

fn open_error_log(path: &Path) -> Result<Mutex<std::fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open error log {}", path.display()))?;
    Ok(Mutex::new(file))
}

/// Install the process-wide subscriber. Called once from `main`.
pub fn init(config: &Config) -> Result<()> {
    let error_log = open_error_log(&config.error_log)?;
    let subscriber = build_subscriber(&config.logger_name, std::io::stderr, error_log);
    tracing::subscriber::set_global_default(subscriber)
        .context("A global tracing subscriber is already installed")?;
    Ok(())
}

/// In-memory sink for tests that need to assert on emitted log lines.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct CapturedLog(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedLog {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

#[cfg(test)]
impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_only_receives_warnings_and_errors() {
        let console = CapturedLog::default();
        let errors = CapturedLog::default();
        let subscriber = build_subscriber("Model Evaluation", console.clone(), errors.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("Saved model loaded successfully");
            tracing::warn!("precision is ill-defined");
            tracing::error!("model artifact not found: models/model.json");
        });

        let log = errors.contents();
        assert!(!log.contains("Saved model loaded"));
        assert!(log.contains(" - Model Evaluation - WARNING - precision is ill-defined"));
        assert!(log.contains(" - Model Evaluation - ERROR - model artifact not found"));
        assert_eq!(log.lines().count(), 2);
    }

    #[test]
    fn test_line_format_has_timestamp_prefix() {
        let errors = CapturedLog::default();
        let subscriber = build_subscriber("eval", std::io::sink, errors.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(path = "x.csv", "failed");
        });

        let line = errors.contents();
        let mut parts = line.trim_end().splitn(4, " - ");
        let (seconds, millis) = parts.next().unwrap().split_once(',').unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(seconds, "%Y-%m-%d %H:%M:%S").is_ok());
        assert_eq!(millis.len(), 3);
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts.next(), Some("eval"));
        assert_eq!(parts.next(), Some("ERROR"));
        assert!(parts.next().unwrap().starts_with("failed"));
    }

    #[test]
    fn test_level_names() {
        assert_eq!(level_name(&Level::WARN), "WARNING");
        assert_eq!(level_name(&Level::ERROR), "ERROR");
        assert_eq!(level_name(&Level::DEBUG), "DEBUG");
    }

    #[test]
    fn test_open_error_log_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("errors.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier line\n").unwrap();

        let sink = open_error_log(&path).unwrap();
        {
            use std::io::Write;
            let mut file = sink.lock().unwrap();
            writeln!(file, "later line").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "earlier line\nlater line\n");
    }
}
