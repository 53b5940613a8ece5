// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Observability crate for logging and prometheus metrics.

use std::{io::IsTerminal, path::Path};

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt::time::UtcTime, prelude::*};

pub mod metrics;

/// Environment variable to define the log level.
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";

/// Default syslog verbosity: errors only.
pub const DEFAULT_SYSLOG_LEVEL: u8 = 3;

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingSetupError {
    /// The name of the running executable cannot be determined.
    #[error("cannot determine the executable name: {0}")]
    ExecutableName(String),
    /// A global subscriber is already installed.
    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Maps a syslog severity (0 = emergency, 7 = debug) to a tracing level.
///
/// Severities above 7 are treated as debug.
pub fn syslog_level(severity: u8) -> LevelFilter {
    match severity {
        0..=3 => LevelFilter::ERROR,
        4 => LevelFilter::WARN,
        5 | 6 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Level of the stderr output.
///
/// Errors always reach stderr. With `log_to_stderr` set, stderr logs at `level` instead.
pub fn stderr_level(log_to_stderr: bool, level: LevelFilter) -> LevelFilter {
    if log_to_stderr {
        level
    } else {
        LevelFilter::ERROR
    }
}

/// Setup logging using the tracing library.
///
/// # Arguments
///
/// * `log_dir`: If provided, logs are written to a file that carries the name of the current
///   executable in this directory.
/// * `log_to_stderr`: If true, stderr logs at `level`. Otherwise only errors are printed to
///   stderr.
/// * `level`: Default level of the file output and of the verbose stderr output.
///   [`LOG_LEVEL_ENV`] takes precedence if set.
pub fn setup_tracing<P: AsRef<Path>>(
    log_dir: Option<P>,
    log_to_stderr: bool,
    level: LevelFilter,
) -> Result<Vec<WorkerGuard>, TracingSetupError> {
    let filter = || {
        EnvFilter::try_from_env(LOG_LEVEL_ENV)
            .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()))
    };

    let mut guards = vec![];
    let mut layers = vec![];

    if let Some(log_dir) = log_dir {
        let log_file = tracing_appender::rolling::daily(
            log_dir.as_ref(),
            format!("{}.log", extract_exec_name()?),
        );
        let (non_blocking_writer, file_guard) = tracing_appender::non_blocking(log_file);
        let file_logger = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(non_blocking_writer)
            .with_filter(filter());
        layers.push(file_logger.boxed());
        guards.push(file_guard);
    }

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_logger = tracing_subscriber::fmt::layer()
        // Enable colors if the stderr is a terminal.
        .with_ansi(std::io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_writer(non_blocking_writer);
    let stderr_logger = if log_to_stderr {
        stderr_logger.with_filter(filter()).boxed()
    } else {
        stderr_logger
            .with_filter(stderr_level(false, level))
            .boxed()
    };
    layers.push(stderr_logger);
    guards.push(guard);

    // global subscriber
    let subscriber = Registry::default().with(layers);
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!(%level, "Logging initialized!");
    Ok(guards)
}

/// Extract the name of the executable that is currently running.
fn extract_exec_name() -> Result<String, TracingSetupError> {
    let exec_path = std::env::current_exe()
        .map_err(|e| TracingSetupError::ExecutableName(e.to_string()))?;
    exec_path
        .file_stem()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| TracingSetupError::ExecutableName(exec_path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syslog_severities() {
        for severity in 0..=3 {
            assert_eq!(syslog_level(severity), LevelFilter::ERROR);
        }
        assert_eq!(syslog_level(4), LevelFilter::WARN);
        assert_eq!(syslog_level(5), LevelFilter::INFO);
        assert_eq!(syslog_level(6), LevelFilter::INFO);
        assert_eq!(syslog_level(7), LevelFilter::DEBUG);
        assert_eq!(syslog_level(42), LevelFilter::DEBUG);
        assert_eq!(syslog_level(DEFAULT_SYSLOG_LEVEL), LevelFilter::ERROR);
    }

    #[test]
    fn errors_always_reach_stderr() {
        assert_eq!(stderr_level(false, LevelFilter::DEBUG), LevelFilter::ERROR);
        assert_eq!(stderr_level(false, LevelFilter::ERROR), LevelFilter::ERROR);
        assert_eq!(stderr_level(true, LevelFilter::DEBUG), LevelFilter::DEBUG);
        assert_eq!(stderr_level(true, LevelFilter::WARN), LevelFilter::WARN);
    }
}
