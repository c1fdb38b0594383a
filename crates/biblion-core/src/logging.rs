//! Logging setup: env_logger backend, routed through indicatif when bars are live

use indicatif::MultiProgress;

/// Padded label and ANSI colour for a level.
fn level_style(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    }
}

/// Last path segment of a log target: `biblion_crossref::source` -> `source`.
fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

/// Render one record. Colour only applies to the level label.
fn render(record: &log::Record, color: bool) -> String {
    let (label, ansi) = level_style(record.level());
    let target = short_target(record.target());
    if color {
        format!("[{ansi}{label}\x1b[0m {target}] {}", record.args())
    } else {
        format!("[{label} {target}] {}", record.args())
    }
}

/// Logger that prints above indicatif bars instead of tearing through them.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.matches(record) {
            let line = render(record, true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn builder(quiet: bool, debug: bool) -> env_logger::Builder {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
}

/// Install the global logger.
///
/// With a `MultiProgress` (TTY), lines are coloured and printed above the
/// bars; otherwise plain lines go to stderr for log aggregation. `RUST_LOG`
/// overrides the level picked from `quiet`/`debug`.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    match multi {
        Some(multi) => {
            let logger = builder(quiet, debug).build();
            let max_level = logger.filter();
            log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))?;
            log::set_max_level(max_level);
            Ok(())
        }
        None => builder(quiet, debug)
            .format(|buf, record| writeln!(buf, "{}", render(record, false)))
            .try_init(),
    }
}
