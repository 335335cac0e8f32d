//! Rolling file logs for directory processes.
//!
//! Log lines are metadata-only `key=value` events: ids, counts and timings,
//! never names, phones or addresses. The logger is installed once per process
//! through a `OnceCell`; later calls must ask for the same target.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "handbook";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_PAYLOAD_MAX_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Where and how verbosely the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: LevelFilter,
    dir: PathBuf,
}

impl LogTarget {
    fn parse(level: &str, dir: &Path) -> Result<Self, LoggingError> {
        let level = level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| LoggingError::UnsupportedLevel(level.trim().to_string()))?;
        if dir.as_os_str().is_empty() || !dir.is_absolute() {
            return Err(LoggingError::InvalidDirectory(format!(
                "expected an absolute path, got `{}`",
                dir.display()
            )));
        }
        Ok(Self {
            level,
            dir: dir.to_path_buf(),
        })
    }
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "level={} dir={}", self.level, self.dir.display())
    }
}

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    InvalidDirectory(String),
    /// A logger with another level or directory is already running.
    Conflict { active: String, requested: String },
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected off|error|warn|info|debug|trace"
            ),
            Self::InvalidDirectory(message) => write!(f, "invalid log directory: {message}"),
            Self::Conflict { active, requested } => {
                write!(f, "logger already running with {active}; cannot switch to {requested}")
            }
            Self::Backend(message) => write!(f, "logger backend failure: {message}"),
        }
    }
}

impl Error for LoggingError {}

/// Starts file logging under `log_dir` at `level`.
///
/// Repeating the call with the same target is a no-op. With `echo_stderr`,
/// warnings and errors are also copied to stderr.
pub fn init_logging(
    level: &str,
    log_dir: impl AsRef<Path>,
    echo_stderr: bool,
) -> Result<(), LoggingError> {
    let requested = LogTarget::parse(level, log_dir.as_ref())?;
    let active = ACTIVE.get_or_try_init(|| start_logger(&requested, echo_stderr))?;
    if active.target != requested {
        return Err(LoggingError::Conflict {
            active: active.target.to_string(),
            requested: requested.to_string(),
        });
    }
    Ok(())
}

fn start_logger(target: &LogTarget, echo_stderr: bool) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&target.dir).map_err(|err| {
        LoggingError::InvalidDirectory(format!("cannot create `{}`: {err}", target.dir.display()))
    })?;

    let duplicate = if echo_stderr {
        Duplicate::Warn
    } else {
        Duplicate::None
    };
    let handle = Logger::with(LogSpecification::builder().default(target.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .duplicate_to_stderr(duplicate)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_start module=logging status=ok version={} {}",
        env!("CARGO_PKG_VERSION"),
        target
    );
    Ok(ActiveLogger {
        target: target.clone(),
        _handle: handle,
    })
}

/// Level and directory of the running logger.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.target.level, active.target.dir.clone()))
}

pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Records panics as one log event before delegating to the previous hook.
fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<opaque>".to_string());
        error!(
            "event=panic module=logging status=error location={location} payload={}",
            one_line(&payload, PANIC_PAYLOAD_MAX_CHARS)
        );
        previous(panic_info);
    }));
}

/// Collapses line breaks and caps `value` at `max_chars` characters.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, LogTarget, LoggingError};
    use log::LevelFilter;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("handbook-log-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn target_parses_level_names_case_insensitively() {
        let dir = scratch_dir("parse");
        let target = LogTarget::parse(" WARN ", &dir).unwrap();
        assert_eq!(target.level, LevelFilter::Warn);
        assert_eq!(
            LogTarget::parse("loud", &dir).unwrap_err(),
            LoggingError::UnsupportedLevel("loud".to_string())
        );
    }

    #[test]
    fn target_requires_absolute_directory() {
        assert!(matches!(
            LogTarget::parse("info", Path::new("logs/dev")),
            Err(LoggingError::InvalidDirectory(_))
        ));
        assert!(matches!(
            LogTarget::parse("info", Path::new("")),
            Err(LoggingError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn one_line_flattens_and_caps_text() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("ромашка", 3), "ром...");
    }

    #[test]
    fn repeated_init_must_match_running_target() {
        let dir = scratch_dir("running");
        let other = scratch_dir("other");

        init_logging("info", &dir, false).unwrap();
        init_logging("INFO", &dir, false).unwrap();

        assert!(matches!(
            init_logging("debug", &dir, false),
            Err(LoggingError::Conflict { .. })
        ));
        assert!(matches!(
            init_logging("info", &other, false),
            Err(LoggingError::Conflict { .. })
        ));
        assert_eq!(logging_status(), Some((LevelFilter::Info, dir)));
    }
}
