//! Log setup for the binary: timestamped lines to stderr and to
//! `<exe_dir>/logs/shiftproof.log`. The library itself only uses the `log` macros.

use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::paths;

pub const LOG_FILE_NAME: &str = "shiftproof.log";

/// Writes every line to stderr and, when available, to the log file.
struct TeeWriter {
    file: Option<File>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            // The console copy is enough if the file goes away
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

fn open_log_file(dir: &Path) -> Option<File> {
    std::fs::create_dir_all(dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
        .ok()
}

/// Installs the global logger. `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) {
    let file = open_log_file(&paths::get_logs_dir());
    let file_missing = file.is_none();

    let result = Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(TeeWriter { file })))
        .try_init();

    if result.is_ok() && file_missing {
        log::warn!("Log file unavailable, logging to console only");
    }
}
