/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::logger
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Provide structured, append-only logging utilities for
    Helm-Up-Core update sessions.

  Security / Safety Notes:
    Completion tokens and service URLs carrying credentials are
    never logged; callers pass pre-redacted messages.

  Dependencies:
    std::fs::File, std::sync::Mutex, sha2 for integrity hashing.

  Operational Scope:
    Used by runtime components to emit RFC-3339 UTC stamped
    log entries and to seal each session with a hash digest.

  Revision History:
    2025-05-12 KSL  Established logging module for Helm-Up-Core.
    2025-06-03 KSL  Session digest now returned to the caller.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful degradation on log I/O failures
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{HelmupError, Result};

/// Structured log level for Helm-Up-Core events.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn mirrored_to_stderr(self, verbose: bool) -> bool {
        verbose || matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

/// Shared logger that emits append-only entries in Helmport format.
pub struct Logger {
    sink: Option<LogSink>,
    verbose: bool,
}

struct LogSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let sink = match path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        HelmupError::Filesystem(format!(
                            "Failed to create log directory {}: {err}",
                            parent.display()
                        ))
                    })?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|err| {
                        HelmupError::Filesystem(format!(
                            "Failed to open log file {}: {err}",
                            path.display()
                        ))
                    })?;
                Some(LogSink {
                    writer: Mutex::new(BufWriter::new(file)),
                    path,
                })
            }
            None => None,
        };

        Ok(Self { sink, verbose })
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = format!(
            "{timestamp} [{}] [{}] {}",
            level.as_str(),
            code,
            message.as_ref()
        );

        if level.mirrored_to_stderr(self.verbose) {
            eprintln!("{payload}");
        }
        if let Some(sink) = &self.sink {
            if !sink.append(&payload) {
                eprintln!("{timestamp} [ERROR] [LOGGER] Failed to write to log file");
            }
        }
    }

    /// Convenience wrapper for `INFO` level events.
    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    /// Convenience wrapper for `WARN` level events.
    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    /// Convenience wrapper for `ERROR` level events.
    #[allow(dead_code)]
    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    /// Convenience wrapper for `DEBUG` level events.
    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Seal the session: hash the log file and persist the digest
    /// alongside it. Returns the digest when a file sink exists.
    pub fn finalize(&self) -> Result<Option<String>> {
        let Some(sink) = &self.sink else {
            return Ok(None);
        };
        let data = std::fs::read(&sink.path).map_err(|err| {
            HelmupError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                sink.path.display()
            ))
        })?;
        let digest = format!("{:x}", Sha256::digest(&data));

        let mut hash_os = sink.path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let line = format!(
            "{digest}  {}\n",
            sink.path.file_name().unwrap_or_default().to_string_lossy()
        );
        std::fs::write(&hash_path, line).map_err(|err| {
            HelmupError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })?;
        Ok(Some(digest))
    }
}

impl LogSink {
    fn append(&self, payload: &str) -> bool {
        let Ok(mut guard) = self.writer.lock() else {
            return false;
        };
        writeln!(guard, "{payload}").is_ok() && guard.flush().is_ok()
    }
}
