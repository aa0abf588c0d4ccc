//! Asynchronous, rotating log sink.
//!
//! One process-wide logger drains formatted lines through a bounded
//! [`BlockingDeque`] onto a dedicated writer thread. Files rotate on the
//! day of month and every [`MAX_LINES`] lines.

pub mod deque;
pub mod time;

pub use deque::BlockingDeque;

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};

use time::DateTime;

/// Lines per log file before a size rollover.
pub const MAX_LINES: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "[debug]",
            Level::Info => "[info]",
            Level::Warn => "[warn]",
            Level::Error => "[error]",
        }
    }
}

struct FileState {
    file: Option<File>,
    path: PathBuf,
    suffix: String,
    today: u32,
    line_count: usize,
}

impl FileState {
    fn write_direct(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Daily rotation resets the line counter; the size rollover keeps it
    /// and numbers the file with the rollover index.
    fn rotate_if_needed(&mut self, now: &DateTime) {
        let daily = self.today != now.day;
        let sized = self.line_count != 0 && self.line_count % MAX_LINES == 0;
        if !daily && !sized {
            return;
        }
        let stem = format!("{:04}_{:02}_{:02}", now.year, now.month, now.day);
        let name = if daily {
            self.today = now.day;
            self.line_count = 0;
            format!("{}{}", stem, self.suffix)
        } else {
            format!("{}-{}{}", stem, self.line_count / MAX_LINES, self.suffix)
        };
        self.open_file(&name);
    }

    fn open_file(&mut self, name: &str) {
        self.flush();
        let full = self.path.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .or_else(|_| {
                fs::create_dir_all(&self.path).ok();
                OpenOptions::new().create(true).append(true).open(&full)
            })
            .expect("failed to open log file");
        self.file = Some(file);
    }
}

pub struct Logger {
    level: AtomicU8,
    state: Mutex<FileState>,
    deque: Option<Arc<BlockingDeque<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

impl Logger {
    /// Installs the process-wide logger. A queue capacity above zero turns
    /// on async mode with a dedicated writer thread. The first call wins;
    /// later calls are no-ops.
    pub fn init(level: Level, path: &str, suffix: &str, queue_capacity: usize) {
        let now = time::utc_now();
        let mut state = FileState {
            file: None,
            path: PathBuf::from(path),
            suffix: suffix.to_string(),
            today: now.day,
            line_count: 0,
        };
        state.open_file(&format!(
            "{:04}_{:02}_{:02}{}",
            now.year, now.month, now.day, suffix
        ));

        let deque = if queue_capacity > 0 {
            Some(Arc::new(BlockingDeque::new(queue_capacity)))
        } else {
            None
        };
        let logger = Logger {
            level: AtomicU8::new(level as u8),
            state: Mutex::new(state),
            deque,
            writer: Mutex::new(None),
        };
        if LOGGER.set(logger).is_err() {
            return;
        }
        let logger = Logger::global().expect("logger just installed");
        if logger.deque.is_some() {
            let handle = thread::Builder::new()
                .name("log-writer".to_string())
                .spawn(|| {
                    Logger::global()
                        .expect("logger installed before writer starts")
                        .drain_loop();
                })
                .expect("failed to spawn log writer thread");
            *logger.writer.lock().unwrap() = Some(handle);
        }
    }

    pub fn global() -> Option<&'static Logger> {
        LOGGER.get()
    }

    pub fn level(&self) -> Level {
        match self.level.load(Ordering::Relaxed) {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            _ => Level::Error,
        }
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn enabled(&self, level: Level) -> bool {
        level as u8 >= self.level.load(Ordering::Relaxed)
    }

    pub fn write(&self, level: Level, args: fmt::Arguments) {
        if !self.enabled(level) {
            return;
        }
        let now = time::utc_now();
        let line = format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06} {} : {}\n",
            now.year,
            now.month,
            now.day,
            now.hour,
            now.minute,
            now.second,
            now.micros,
            level.tag(),
            args
        );
        let mut state = self.state.lock().unwrap();
        state.rotate_if_needed(&now);
        state.line_count += 1;
        // A full queue falls back to a direct write rather than blocking
        // the producer against the drain thread.
        match &self.deque {
            Some(queue) => {
                if let Err(line) = queue.try_push_back(line) {
                    state.write_direct(&line);
                }
            }
            None => state.write_direct(&line),
        }
    }

    pub fn flush(&self) {
        if let Some(queue) = &self.deque {
            queue.flush();
        }
        self.state.lock().unwrap().flush();
    }

    /// Drains outstanding lines, stops the writer thread and flushes the
    /// current file. Idempotent.
    pub fn close(&self) {
        if let Some(queue) = &self.deque {
            while !queue.is_empty() {
                queue.flush();
                thread::yield_now();
            }
            queue.close();
        }
        if let Some(handle) = self.writer.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.state.lock().unwrap().flush();
    }

    fn drain_loop(&self) {
        let Some(queue) = &self.deque else {
            return;
        };
        while let Some(line) = queue.pop() {
            self.state.lock().unwrap().write_direct(&line);
        }
    }
}

#[macro_export]
macro_rules! log_write {
    ($level:expr, $($arg:tt)*) => {
        if let Some(logger) = $crate::Logger::global() {
            logger.write($level, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! debug { ($($arg:tt)*) => { $crate::log_write!($crate::Level::Debug, $($arg)*) }; }
#[macro_export]
macro_rules! info { ($($arg:tt)*) => { $crate::log_write!($crate::Level::Info, $($arg)*) }; }
#[macro_export]
macro_rules! warn { ($($arg:tt)*) => { $crate::log_write!($crate::Level::Warn, $($arg)*) }; }
#[macro_export]
macro_rules! error { ($($arg:tt)*) => { $crate::log_write!($crate::Level::Error, $($arg)*) }; }
