//! Session log for Visualysium.
//!
//! One file per session, overwritten at each launch:
//!   Windows:  `%APPDATA%\Visualysium\visualysium.log`
//!   Linux:    `$XDG_DATA_HOME/Visualysium/visualysium.log` (or `~/.local/share/...`)
//!   macOS:    `~/Library/Application Support/Visualysium/visualysium.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` / `log_debug!` macros.
//! Before [`init`] runs (library use, unit tests) nothing is written to a
//! file; with `verbose` set, lines are echoed to stderr as well.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static VERBOSE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Path of the current session log, if [`init`] succeeded.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Format and record one message. I/O failures are swallowed.
pub fn write(level: Level, msg: &str) {
    // Debug lines only exist in verbose sessions.
    if level == Level::Debug && !is_verbose() {
        return;
    }
    let line = format_line(&clock(), level, msg);
    if is_verbose() {
        eprintln!("{line}");
    }
    write_line(&line);
}

fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{line}");
    }
}

fn format_line(clock: &str, level: Level, msg: &str) -> String {
    format!("[{clock}] [{}] {msg}", level.tag())
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

/// Open the session log in the platform data directory and install a panic
/// hook that mirrors panics into it. Call once, early in `main`.
pub fn init(verbose: bool) {
    set_verbose(verbose);
    init_at(&default_log_path());
}

/// Same as [`init`] but with an explicit file location.
pub fn init_at(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {e}", path.display());
            return;
        }
    };
    if LOG_FILE.set(Mutex::new(file)).is_err() {
        // Already initialised for this process.
        return;
    }
    let _ = LOG_PATH.set(path.to_path_buf());

    write_line(&format!("=== Visualysium session (unix {}) ===", unix_secs()));
    write_line(&format!("Log file: {}", path.display()));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format_line(&clock(), Level::Error, &format!("PANIC: {info}")));
        prev(info);
    }));
}

fn default_log_path() -> PathBuf {
    data_dir().join("Visualysium").join("visualysium.log")
}

fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// HH:MM:SS (UTC) within the current day.
fn clock() -> String {
    let secs = unix_secs();
    format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
}
