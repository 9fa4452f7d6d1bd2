use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

use crate::PROGRESS_BAR;

/// Writes log lines to the standard error, above the progress bar if it is
/// visible. Records are filtered by `log::max_level` only.
struct StderrLogger;

impl StderrLogger {
    fn format(record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");

        // Module paths only help when debugging.
        if record.level() >= Level::Debug {
            format!(
                "{} {:<5} [{}] {}",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            format!("{} {:<5} {}", timestamp, record.level(), record.args())
        }
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = Self::format(record);
        if PROGRESS_BAR.is_hidden() {
            eprintln!("{}", msg);
        } else {
            PROGRESS_BAR.println(msg);
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

pub fn init_logging(filter: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(filter);

    Ok(())
}
