//! # Logging setup.
//!
//! [`init`] installs a global `tracing` subscriber for a daemon:
//! - a file layer appending to `<log_dir>/<name>.log` (no ANSI colors),
//!   when `log_dir` is set;
//! - a terminal layer on stdout, only when the daemon does not detach.
//!
//! Both layers prefix records with local time as `[dd.mm.YYYY HH:MM:SS]` and
//! honor `RUST_LOG` (default `info`). On a terminal, error records are
//! printed in red.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::IsTerminal;
use std::sync::Mutex;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use crate::core::Config;
use crate::error::RuntimeError;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Local time in square brackets.
struct Bracketed(ChronoLocal);

impl Bracketed {
    fn new() -> Self {
        Self(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
    }
}

impl FormatTime for Bracketed {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        w.write_char('[')?;
        self.0.format_time(w)?;
        w.write_char(']')
    }
}

/// Wraps a formatter and paints whole `ERROR` lines red when `colored`.
struct ErrorsInRed<F> {
    inner: F,
    colored: bool,
}

impl<F> ErrorsInRed<F> {
    fn new(inner: F, colored: bool) -> Self {
        Self { inner, colored }
    }
}

impl<S, N, F> FormatEvent<S, N> for ErrorsInRed<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        if !self.colored || *event.metadata().level() != Level::ERROR {
            return self.inner.format_event(ctx, writer, event);
        }
        let mut line = String::new();
        self.inner.format_event(ctx, Writer::new(&mut line), event)?;
        writeln!(writer, "{RED}{}{RESET}", line.trim_end_matches('\n'))
    }
}

/// Installs the global subscriber. Fails if the log file cannot be opened or
/// a global subscriber is already set.
pub fn init(cfg: &Config) -> Result<(), RuntimeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match cfg.log_path() {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).map_err(|e| log_error(&path, e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| log_error(&path, e))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_timer(Bracketed::new()),
            )
        }
        None => None,
    };

    let console_layer = (!cfg.daemonize).then(|| {
        let colored = std::io::stdout().is_terminal();
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(false)
            .event_format(ErrorsInRed::new(fmt::format().with_timer(Bracketed::new()), colored))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| RuntimeError::Logging {
            reason: e.to_string(),
        })
}

fn log_error(path: &std::path::Path, err: std::io::Error) -> RuntimeError {
    RuntimeError::Logging {
        reason: format!("{}: {err}", path.display()),
    }
}

/// In-memory log sink for tests.
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::Captured;
    use super::*;

    fn format_with(colored: bool, emit: impl FnOnce()) -> String {
        let out = Captured::default();
        let sink = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .event_format(ErrorsInRed::new(fmt::format().with_timer(Bracketed::new()), colored))
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        out.text()
    }

    #[test]
    fn test_timestamp_is_bracketed() {
        let mut out = String::new();
        Bracketed::new().format_time(&mut Writer::new(&mut out)).unwrap();

        // [dd.mm.YYYY HH:MM:SS]
        assert_eq!(out.len(), 21, "{out}");
        assert!(out.starts_with('[') && out.ends_with(']'));
        assert_eq!(&out[3..4], ".");
    }

    #[test]
    fn test_error_lines_are_red_on_terminal() {
        let text = format_with(true, || {
            tracing::error!("job exploded");
            tracing::info!("all good");
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");

        assert!(lines[0].starts_with(RED) && lines[0].ends_with(RESET));
        assert!(lines[0].contains("ERROR") && lines[0].contains("job exploded"));
        assert!(lines[1].starts_with('['));
        assert!(!lines[1].contains('\x1b'));
    }

    #[test]
    fn test_no_color_off_terminal() {
        let text = format_with(false, || tracing::error!("job exploded"));
        assert!(text.starts_with('['));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_unopenable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let mut cfg = Config::named("mailer");
        cfg.log_dir = Some(blocker.join("logs"));

        let err = init(&cfg).unwrap_err();
        assert_eq!(err.as_label(), "runtime_logging");
    }
}
