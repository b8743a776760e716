/*
================================================================================
                            yoloview Logging
================================================================================

Console logging through the `log` facade with an `env_logger` backend, plus
an in-memory copy of recent lines that is dumped when the process panics.

- `setup_logger()`: installs the composite console + buffer logger
- `setup_panic_hook()`: writes panic.log with backtrace and recent log lines

Log levels:
- RUST_LOG set: used as given
- Debug builds: DEBUG and above for this crate
- Release builds: INFO and above for this crate
- Other crates are silenced unless RUST_LOG says otherwise

Logs live in `<data_dir>/yoloview/logs/`.
================================================================================
*/

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use env_logger::fmt::{Color, Formatter};
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;

use crate::config::APP_NAME;

const MAX_LOG_LINES: usize = 1000;

static LOG_BUFFER: Lazy<Arc<Mutex<VecDeque<String>>>> = Lazy::new(|| {
    Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)))
});

struct BufferLogger {
    log_buffer: Arc<Mutex<VecDeque<String>>>,
}

impl BufferLogger {
    fn log_to_buffer(&self, message: &str, target: &str, line: Option<u32>) {
        let Ok(mut buffer) = self.log_buffer.lock() else {
            return;
        };
        if buffer.len() == MAX_LOG_LINES {
            buffer.pop_front();
        }

        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");
        let formatted_message = if let Some(line_num) = line {
            format!("{timestamp} {target}:{line_num} {message}")
        } else {
            format!("{timestamp} {target} {message}")
        };

        buffer.push_back(formatted_message);
    }
}

impl log::Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(APP_NAME) && metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{:<5} {}", record.level(), record.args());
            self.log_to_buffer(&message, record.target(), record.line());
        }
    }

    fn flush(&self) {}
}

struct CompositeLogger {
    console_logger: env_logger::Logger,
    buffer_logger: BufferLogger,
}

impl log::Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console_logger.enabled(metadata) || self.buffer_logger.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console_logger.enabled(record.metadata()) {
            self.console_logger.log(record);
        }
        if self.buffer_logger.enabled(record.metadata()) {
            self.buffer_logger.log(record);
        }
    }

    fn flush(&self) {
        self.console_logger.flush();
        self.buffer_logger.flush();
    }
}

/// Install the process-wide logger. `verbose` forces debug output in
/// release builds when RUST_LOG is not set.
pub fn setup_logger(verbose: bool) -> Arc<Mutex<VecDeque<String>>> {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        if cfg!(debug_assertions) || verbose {
            builder.filter(Some(APP_NAME), LevelFilter::Debug);
        } else {
            builder.filter(Some(APP_NAME), LevelFilter::Info);
        }
        // Filter out all other crates' logs
        builder.filter(None, LevelFilter::Off);
    }

    builder.format(|buf: &mut Formatter, record: &Record| {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        let module_info = match (record.module_path(), record.line()) {
            (Some(module), Some(line)) => format!("{module}:{line}"),
            (Some(module), None) => module.to_string(),
            (None, Some(line)) => format!("line:{line}"),
            (None, None) => "unknown".to_string(),
        };

        let mut level_style = buf.style();
        let mut meta_style = buf.style();

        match record.level() {
            Level::Error => level_style.set_color(Color::Red).set_bold(true),
            Level::Warn => level_style.set_color(Color::Yellow).set_bold(true),
            Level::Info => level_style.set_color(Color::Green).set_bold(true),
            Level::Debug => level_style.set_color(Color::Blue).set_bold(true),
            Level::Trace => level_style.set_color(Color::White),
        };

        #[cfg(target_os = "macos")]
        {
            // Color::Rgb does not work on macOS, so we use Color::Blue as a workaround
            meta_style.set_color(Color::Blue);
        }

        #[cfg(not(target_os = "macos"))]
        {
            meta_style.set_color(Color::Rgb(120, 120, 120));
        }

        writeln!(
            buf,
            "{} {} {} {}",
            meta_style.value(timestamp),
            level_style.value(record.level()),
            meta_style.value(module_info),
            record.args()
        )
    });

    let composite_logger = CompositeLogger {
        console_logger: builder.build(),
        buffer_logger: BufferLogger {
            log_buffer: Arc::clone(&LOG_BUFFER),
        },
    };

    // A logger may already be installed, e.g. by a test harness
    if log::set_boxed_logger(Box::new(composite_logger)).is_ok() {
        // Always set the maximum level to Trace so that filtering works correctly
        log::set_max_level(LevelFilter::Trace);
    }

    Arc::clone(&LOG_BUFFER)
}

pub fn get_log_directory() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME).join("logs")
}

/// Write panic.log with the panic location, a backtrace and recent log lines
pub fn setup_panic_hook(log_buffer: Arc<Mutex<VecDeque<String>>>) {
    let log_file_path = get_log_directory().join("panic.log");

    panic::set_hook(Box::new(move |info| {
        let backtrace = backtrace::Backtrace::new();
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        let location = if let Some(location) = info.location() {
            format!("{}:{}", location.file(), location.line())
        } else {
            "unknown location".to_string()
        };

        let header_msg = format!("[PANIC] at {location} - {info}");
        let backtrace_lines: Vec<String> = format!("{backtrace:?}")
            .lines()
            .map(|line| format!("[BACKTRACE] {}", line.trim()))
            .collect();

        eprintln!("\n\n{header_msg}");
        eprintln!("[PANIC] Backtrace:");
        for line in &backtrace_lines {
            eprintln!("{line}");
        }

        // The hook must not panic itself, so file errors are only reported
        let written = log_file_path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| {
                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&log_file_path)?;

                writeln!(file, "{timestamp} {header_msg}")?;
                writeln!(file, "{timestamp} [PANIC] Backtrace:")?;
                for line in &backtrace_lines {
                    writeln!(file, "{timestamp} {line}")?;
                }
                writeln!(file)?;
                writeln!(file, "{timestamp} [PANIC] Last {MAX_LOG_LINES} log entries:")?;
                if let Ok(buffer) = log_buffer.lock() {
                    for log in buffer.iter() {
                        writeln!(file, "{log}")?;
                    }
                }
                Ok(())
            });

        match written {
            Ok(()) => eprintln!("\nA complete crash log has been written to: {}", log_file_path.display()),
            Err(e) => eprintln!("\nFailed to write crash log {}: {}", log_file_path.display(), e),
        }
    }));
}
