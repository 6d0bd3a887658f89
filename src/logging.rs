//! A small `log::Log` implementation writing to the run's `--log` file, with
//! every record echoed through to stderr at `warn` and above so operators
//! see fatal/near-fatal conditions even without `--log`.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

struct FileLogger {
    file: Option<Mutex<File>>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("{} {}", record.level(), record.args());
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{line}");
            }
        }
        if record.level() <= Level::Warn || self.file.is_none() {
            eprintln!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// Install the process-wide logger, optionally appending to `log_path`.
/// Safe to call once per process; a second call is a no-op error that's
/// silently ignored (tests may install it more than once across threads).
pub fn init(log_path: Option<&Path>) {
    let file = log_path.and_then(|p| {
        File::options()
            .create(true)
            .append(true)
            .open(p)
            .map(Mutex::new)
            .ok()
    });
    let logger = FileLogger { file };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}
