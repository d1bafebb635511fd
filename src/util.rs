use anyhow::Result;
use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::UploadError;

/// Try to enable ANSI escape sequence support on Windows consoles.
/// Returns true if enabling succeeded (or platform likely already supports ANSI), false otherwise.
#[cfg(windows)]
pub fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

// On non-Windows platforms the crate is not required and ANSI support is typically available
// by default in terminals; provide a no-op fallback to avoid referencing the optional crate.
#[cfg(not(windows))]
pub fn try_enable_ansi_on_windows() -> bool {
    false
}

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Initialize a MultiProgress with a one-line header (startup info, then
/// per-group status text) above a percentage bar.
pub fn init_progress_and_mp(verbose: bool) -> Result<(MultiProgress, ProgressBar, ProgressBar)> {
    let mp = if verbose {
        MultiProgress::with_draw_target(ProgressDrawTarget::stdout())
    } else {
        MultiProgress::new()
    };
    let header = mp.add(ProgressBar::new_spinner());
    header.set_style(ProgressStyle::with_template("{msg}")?);
    let total_pb = mp.add(ProgressBar::new(100));
    total_pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}%",
        )?
        .progress_chars("=> "),
    );
    total_pb.enable_steady_tick(Duration::from_millis(120));
    // attempt to enable ANSI on Windows (best-effort)
    let _ = try_enable_ansi_on_windows();
    Ok((mp, header, total_pb))
}

/// Startup line with action, group, file and size fields, 4 spaces apart.
pub fn startup_header(action: &str, groups: usize, files: usize, total_bytes: u64) -> String {
    let action_field = format!("{:<12}", format!("Action:{}", action));
    let groups_field = format!("{:<12}", format!("Groups:{}", groups));
    let files_field = format!("{:<12}", format!("Files:{}", files));
    let size_field = format!("{:<16}", format!("Size:{}", human_bytes(total_bytes)));
    if try_enable_ansi_on_windows() {
        format!(
            "{}    {}    {}    {}",
            action_field.green(),
            groups_field.cyan(),
            files_field.yellow(),
            size_field.magenta()
        )
    } else {
        format!("{}    {}    {}    {}", action_field, groups_field, files_field, size_field)
    }
}

/// Print a concise summary line for a finished push.
pub fn print_summary(succeeded: usize, total: usize, uploaded_bytes: u64, elapsed_secs: f64) {
    let mb = uploaded_bytes as f64 / 1024.0 / 1024.0;
    let rate = if elapsed_secs > 0.0 { mb / elapsed_secs } else { 0.0 };
    let line = format!(
        "{}/{} groups uploaded | {} sent in {:.2}s ({:.2} MB/s)",
        succeeded,
        total,
        human_bytes(uploaded_bytes),
        elapsed_secs,
        rate
    );
    if succeeded == total && total > 0 {
        println!("{}", line.green());
    } else if succeeded > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.red());
    }
}

/// Write per-group failures as JSON Lines into `dir` (default `~/.reelpack/logs`).
/// Returns the file written, or None when nothing could be written.
pub fn write_failures_jsonl(dir: Option<&Path>, failures: &[UploadError]) -> Option<PathBuf> {
    if failures.is_empty() {
        return None;
    }
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => crate::config::logs_dir().ok()?,
    };
    std::fs::create_dir_all(&dir).ok()?;
    let path = dir.join(format!("failures_{}.jsonl", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
    let mut f = OpenOptions::new().create(true).append(true).open(&path).ok()?;
    for err in failures {
        let obj = match err {
            UploadError::ArchiveBuildFailed(g, m) | UploadError::TransportFailed(g, m) => {
                serde_json::json!({"variant":err.variant(),"group":g,"error":m,"message":err.to_string()})
            }
            _ => serde_json::json!({"variant":err.variant(),"message":err.to_string()}),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(f, "{}", line);
        }
    }
    Some(path)
}

/// Install the global subscriber. With `log_file` set, events go to that file
/// through a non-blocking writer at debug level; keep the returned guard alive
/// until exit. Otherwise stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing(log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let _ = std::fs::create_dir_all(dir);
            let file_name = path.file_name()?.to_owned();
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelpack=debug,info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        None => {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
    }
}

// Default backoff base in milliseconds. Can be adjusted at runtime via `set_backoff_ms`.
static BACKOFF_BASE_MS: AtomicU64 = AtomicU64::new(500);

/// Set the base backoff in milliseconds used by `retry_operation` between attempts.
pub fn set_backoff_ms(ms: u64) {
    BACKOFF_BASE_MS.store(ms, Ordering::SeqCst);
}

/// Get the current base backoff in milliseconds used by `retry_operation`.
pub fn get_backoff_ms() -> u64 {
    BACKOFF_BASE_MS.load(Ordering::SeqCst)
}

/// Generic retry helper: runs `op` up to `max_attempts` times with linear
/// backoff. `max_attempts` of 0 is treated as 1. An `UploadError` that is not
/// retriable ends the loop at once.
pub fn retry_operation<F, T>(max_attempts: usize, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = max_attempts.max(1);
    let mut last_err: Option<anyhow::Error> = None;
    for attempt in 0..attempts {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if let Some(ue) = e.downcast_ref::<UploadError>()
                    && !ue.is_retriable()
                {
                    return Err(e);
                }
                if attempt + 1 < attempts {
                    let wait = get_backoff_ms().saturating_mul(attempt as u64 + 1);
                    tracing::debug!("attempt {} failed: {:#}; retrying in {}ms", attempt + 1, e, wait);
                    std::thread::sleep(Duration::from_millis(wait));
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        UploadError::OperationFailed("operation failed".to_string()).into()
    }))
}
