use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, ensure};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "oneira.log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Keeps the non-blocking log writer alive for the process lifetime.
/// Dropping it flushes and stops the file appender.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Installs the global subscriber: JSON lines to a rolling file under
/// `logging.dir`, filtered per `logging.filter` (targets follow the
/// module areas: `ledger`, `referral`, `payment`, `interpreter`,
/// `service`, `server`), plus an optional WARN echo on stderr.
pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    ensure!(
        !config.filter.trim().is_empty(),
        "logging.filter cannot be empty"
    );
    ensure!(
        !config.dir.as_os_str().is_empty(),
        "logging.dir cannot be empty"
    );

    let log_dir = absolute_log_dir(&config.dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let sweep = sweep_expired_logs(&log_dir, config.retention_days);

    let appender = match config.rotation {
        LoggingRotation::Daily => tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => tracing_appender::rolling::hourly(&log_dir, LOG_FILE_PREFIX),
    };
    let (writer, worker_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(parse_filter(&config.filter)?);

    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        retention_days = config.retention_days,
        expired_logs_removed = sweep.removed,
        "logging_initialized"
    );
    for warning in &sweep.warnings {
        tracing::warn!(target: "logging", %warning, "log_retention_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
    })
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn absolute_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }

    Ok(std::env::current_dir()
        .context("failed to resolve working directory for logging.dir")?
        .join(dir))
}

/// Outcome of one retention pass over the log directory. Warnings are
/// collected rather than logged because the sweep runs before the
/// subscriber is installed.
struct RetentionSweep {
    removed: usize,
    warnings: Vec<String>,
}

fn sweep_expired_logs(log_dir: &Path, retention_days: usize) -> RetentionSweep {
    sweep_expired_logs_before(log_dir, retention_days, SystemTime::now())
}

fn sweep_expired_logs_before(
    log_dir: &Path,
    retention_days: usize,
    now: SystemTime,
) -> RetentionSweep {
    let retention = Duration::from_secs((retention_days as u64).saturating_mul(SECONDS_PER_DAY));
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut sweep = RetentionSweep {
        removed: 0,
        warnings: Vec::new(),
    };

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            sweep
                .warnings
                .push(format!("cannot scan {}: {err}", log_dir.display()));
            return sweep;
        }
    };

    for entry in entries {
        match remove_if_expired(entry, cutoff) {
            Ok(true) => sweep.removed += 1,
            Ok(false) => {}
            Err(err) => sweep.warnings.push(format!("{err:#}")),
        }
    }

    sweep
}

/// Removes the entry if it is a rolled log file last written before the
/// cutoff. Non-log files and directories are left alone.
fn remove_if_expired(entry: io::Result<fs::DirEntry>, cutoff: SystemTime) -> Result<bool> {
    let entry = entry.context("unreadable log directory entry")?;
    if !entry
        .file_name()
        .to_string_lossy()
        .starts_with(LOG_FILE_PREFIX)
    {
        return Ok(false);
    }

    let path = entry.path();
    let metadata = entry
        .metadata()
        .with_context(|| format!("cannot stat {}", path.display()))?;
    if !metadata.is_file() {
        return Ok(false);
    }

    let modified = metadata
        .modified()
        .with_context(|| format!("cannot read mtime of {}", path.display()))?;
    if modified > cutoff {
        return Ok(false);
    }

    fs::remove_file(&path)
        .with_context(|| format!("cannot remove expired log {}", path.display()))?;
    Ok(true)
}
