//! Session logger: writes all log output to a single file in the OS data directory.
//!
//! The file is **truncated at each launch**, so it only ever holds output from
//! the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\PixelPattern\pixelpattern.log`
//!   Linux:    `~/.local/share/PixelPattern/pixelpattern.log`
//!   macOS:    `~/Library/Application Support/PixelPattern/pixelpattern.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the crate.
//! Until [`init`] has run (library consumers, unit tests) every write is a no-op.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::settings::EngineSettings;

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static ECHO_STDERR: OnceLock<bool> = OnceLock::new();

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a line to the session log. I/O errors are swallowed so logging
/// never fails an edit.
pub fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
    if ECHO_STDERR.get().copied().unwrap_or(false) {
        eprintln!("{}", line);
    }
}

/// Write a timestamped, level-tagged line to the session log.
pub fn write(level: &str, msg: &str) {
    write_line(&format!("[{}] [{}] {}", timestamp(), level, msg));
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}

/// Initialise the session logger. Call once before any logging.
///
/// * Creates (or truncates) the log file.
/// * Opens it with a header naming the settings file and the engine limits
///   in effect, so a bug report carries the configuration it ran under.
/// * With `echo_stderr`, every line is mirrored to stderr as well (CLI verbose mode).
/// * Installs a panic hook that writes the panic message to the log before
///   handing over to the default handler.
pub fn init(echo_stderr: bool, settings: &EngineSettings) {
    let _ = ECHO_STDERR.set(echo_stderr);
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            // Not fatal, just run without a file.
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    let settings_path = EngineSettings::settings_path();
    for line in session_header(&path, settings_path.as_deref(), settings) {
        write_line(&line);
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

/// Lines that open every session log.
fn session_header(log_file: &Path, settings_path: Option<&Path>, settings: &EngineSettings) -> Vec<String> {
    let settings_line = match settings_path {
        Some(p) if p.exists() => format!("Settings: {}", p.display()),
        Some(p) => format!("Settings: {} (not found, using defaults)", p.display()),
        None => "Settings: no config directory, using defaults".to_string(),
    };
    vec![
        format!("=== PixelPattern {} session started {} ===", env!("CARGO_PKG_VERSION"), human_timestamp()),
        format!("Log file: {}", log_file.display()),
        settings_line,
        format!(
            "New grid {}x{}, {} undo steps, export scale {}x, zoom {}..{}",
            settings.default_width,
            settings.default_height,
            settings.max_undo_steps,
            settings.export_scale,
            settings.min_zoom,
            settings.max_zoom
        ),
        String::new(),
    ]
}

fn log_file_path() -> PathBuf {
    data_dir().join("PixelPattern").join("pixelpattern.log")
}

/// Platform data directory (without the app sub-folder).
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

/// HH:MM:SS (UTC) within the current day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}
