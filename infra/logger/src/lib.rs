//! # Logger
//!
//! Installs the process-wide `tracing` subscriber for Passio binaries.
//!
//! Console output goes to **stderr** in compact form so that stdout carries only command
//! output; colors are enabled when stderr is a terminal. File output is opt-in: a rolling
//! appender behind a non-blocking writer, as plain text or JSON lines.
//!
//! Filtering follows one rule: explicit directives ([`LoggerBuilder::env_filter`] or
//! [`LogSettings::filter`]) win, otherwise `RUST_LOG`, otherwise the configured level.
//!
//! ## Example
//!
//! ```rust
//! use passio_logger::{LogSettings, Logger};
//!
//! let settings = LogSettings { level: "debug".into(), ..LogSettings::default() };
//! let _logger = Logger::from_settings("passio", &settings).unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use private::Sealed;
use serde::Deserialize;
use std::io::IsTerminal;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const DEFAULT_MAX_FILES: usize = 7;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolling {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<Rolling> for Rotation {
    fn from(rolling: Rolling) -> Self {
        match rolling {
            Rolling::Minutely => Self::MINUTELY,
            Rolling::Hourly => Self::HOURLY,
            Rolling::Daily => Self::DAILY,
            Rolling::Never => Self::NEVER,
        }
    }
}

/// The `[logging]` table of a configuration file.
///
/// ```toml
/// [logging]
/// level = "info"
/// filter = "passio_vault=debug"
/// directory = "logs"
/// json = true
/// rolling = "hourly"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
    pub filter: Option<String>,
    /// Enables file logging into this directory.
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub console: bool,
    pub max_files: usize,
    pub rolling: Rolling,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            filter: None,
            directory: None,
            json: false,
            console: true,
            max_files: DEFAULT_MAX_FILES,
            rolling: Rolling::Daily,
        }
    }
}

#[derive(Debug)]
struct Options {
    level: LevelFilter,
    directives: Option<String>,
    console: bool,
    directory: Option<PathBuf>,
    rotation: Rotation,
    max_files: usize,
    json: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            directives: None,
            console: true,
            directory: None,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);
#[derive(Debug)]
pub struct NoFile;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}
impl Sealed for NoFile {}
impl Sealed for WithFile {}

/// A builder for the global tracing subscriber.
///
/// [`LoggerBuilder::init`] needs a name, which doubles as the log file prefix. Rotation,
/// retention and JSON output only exist after [`LoggerBuilder::path`].
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = NoFile> {
    options: Options,
    name: N,
    file: PhantomData<F>,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { options: Options::default(), name: NoName, file: PhantomData }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Sealed> LoggerBuilder<NoName, F> {
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName, F> {
        LoggerBuilder { options: self.options, name: WithName(name.into()), file: PhantomData }
    }
}

impl<N: Sealed, F: Sealed> LoggerBuilder<N, F> {
    /// Level used when neither explicit directives nor `RUST_LOG` are present.
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.options.level = level;
        self
    }

    /// Filter directives such as `passio_vault=debug,passio_storage=info`.
    ///
    /// They replace `RUST_LOG`; malformed directives make [`LoggerBuilder::init`] fail.
    #[must_use]
    pub fn env_filter(mut self, directives: impl Into<String>) -> Self {
        self.options.directives = Some(directives.into());
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.options.console = enabled;
        self
    }

    /// Also writes logs to rolling files inside `directory`.
    pub fn path(self, directory: impl Into<PathBuf>) -> LoggerBuilder<N, WithFile> {
        let mut options = self.options;
        options.directory = Some(directory.into());
        LoggerBuilder { options, name: self.name, file: PhantomData }
    }
}

impl<N: Sealed> LoggerBuilder<N, WithFile> {
    /// Rotated files kept on disk; older ones are deleted.
    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.options.max_files = max;
        self
    }

    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.options.rotation = rotation;
        self
    }

    /// Writes JSON lines to the file; the console stays human-readable.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.options.json = enabled;
        self
    }
}

impl<F: Sealed> LoggerBuilder<WithName, F> {
    /// Installs the subscriber.
    ///
    /// Keep the returned [`Logger`] alive until exit: dropping it flushes and stops the
    /// background file writer.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] For a blank name, zero `max_files`, malformed
    ///   directives, or neither console nor file output.
    /// * [`LoggerError::Io`] If the log directory cannot be created.
    /// * [`LoggerError::Appender`] If the rolling appender cannot be built.
    /// * [`LoggerError::Subscriber`] If this process already has a global subscriber.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let Self { options, name: WithName(name), .. } = self;
        if name.trim().is_empty() {
            return Err(invalid("logger name is blank"));
        }
        if options.max_files == 0 {
            return Err(invalid("max_files must be at least 1"));
        }
        if !options.console && options.directory.is_none() {
            return Err(invalid("no output enabled; turn on the console or set a directory"));
        }

        let filter = env_filter(&options)?;
        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

        if options.console {
            let ansi = std::io::stderr().is_terminal();
            layers.push(
                fmt::layer().compact().with_ansi(ansi).with_writer(std::io::stderr).boxed(),
            );
        }

        let guard = match &options.directory {
            Some(directory) => {
                let (layer, guard) = file_layer(&name, directory, &options)?;
                layers.push(layer);
                Some(guard)
            },
            None => None,
        };

        tracing_subscriber::registry().with(layers).with(filter).try_init()?;
        Ok(Logger { guard })
    }
}

fn invalid(message: &'static str) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}

fn env_filter(options: &Options) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(options.level.into());
    let Some(directives) = &options.directives else {
        return Ok(builder.from_env_lossy());
    };
    builder.parse(directives).map_err(|err| LoggerError::InvalidConfiguration {
        message: format!("malformed filter {directives:?}: {err}").into(),
        context: None,
    })
}

fn file_layer(
    name: &str,
    directory: &Path,
    options: &Options,
) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
    std::fs::create_dir_all(directory)
        .context(format!("Failed to create log directory: {}", directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(options.rotation.clone())
        .filename_prefix(name)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(options.max_files)
        .build(directory)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    let layer = if options.json { layer.json().boxed() } else { layer.boxed() };
    Ok((layer, guard))
}

/// The installed logging system.
#[must_use = "Dropping this handle stops the background file writer."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Installs the subscriber described by a `[logging]` table.
    ///
    /// # Errors
    /// [`LoggerError::InvalidConfiguration`] for an unknown level, and every error of
    /// [`LoggerBuilder::init`].
    pub fn from_settings(name: &str, settings: &LogSettings) -> Result<Self, LoggerError> {
        let level: LevelFilter =
            settings.level.parse().map_err(|_| LoggerError::InvalidConfiguration {
                message: format!("unknown log level {:?}", settings.level).into(),
                context: None,
            })?;

        let mut builder = Self::builder().name(name).level(level).console(settings.console);
        if let Some(filter) = &settings.filter {
            builder = builder.env_filter(filter.as_str());
        }

        match &settings.directory {
            Some(directory) => builder
                .path(directory)
                .rotation(settings.rolling.into())
                .max_files(settings.max_files)
                .json(settings.json)
                .init(),
            None => builder.init(),
        }
    }

    /// The file writer guard, present only when file logging is enabled.
    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn builder_starts_quiet_on_the_console() {
        let builder = Logger::builder().name("passio-test").env_filter("passio_vault=debug");
        assert!(builder.options.console);
        assert_eq!(builder.options.level, LevelFilter::WARN);
        assert_eq!(builder.options.directives.as_deref(), Some("passio_vault=debug"));
        assert!(builder.options.directory.is_none());
    }

    #[test]
    fn file_options_follow_the_path() {
        let builder = Logger::builder()
            .path("logs")
            .max_files(3)
            .json(true)
            .name("passio-test")
            .level(LevelFilter::DEBUG);

        assert_eq!(builder.options.level, LevelFilter::DEBUG);
        assert_eq!(builder.options.max_files, 3);
        assert!(builder.options.json);
        assert_eq!(builder.options.directory, Some(PathBuf::from("logs")));
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: LogSettings =
            serde_json::from_str(r#"{"level":"info","rolling":"hourly"}"#).unwrap();
        assert_eq!(settings.level, "info");
        assert_eq!(settings.rolling, Rolling::Hourly);
        assert_eq!(settings.max_files, DEFAULT_MAX_FILES);
        assert!(settings.console);
        assert_eq!(Rotation::from(settings.rolling), Rotation::HOURLY);
    }

    #[test]
    #[serial]
    fn invalid_configurations_fail_before_install() {
        let blank = Logger::builder().name("  ").init().unwrap_err();
        let silent = Logger::builder().name("passio-test").console(false).init().unwrap_err();
        let filter = Logger::builder().name("passio-test").env_filter("passio=loud").init();
        let level = LogSettings { level: "chatty".into(), ..LogSettings::default() };
        let level = Logger::from_settings("passio-test", &level);

        for err in [blank, silent, filter.unwrap_err(), level.unwrap_err()] {
            assert_eq!(err.kind(), "InvalidConfiguration");
        }
    }
}
