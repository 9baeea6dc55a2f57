//! # File I/O Module
//!
//! Quote files for the command line and other hosts. None of the engine
//! modules call into this one.
//!
//! - **Atomic saves**: write to `.tmp`, sync, rename over the quote
//! - **File locking**: an OS lock plus a `.lock` file naming the holder
//! - **Version validation**: semver check against [`SCHEMA_VERSION`]
//!
//! ## File Format
//!
//! Quotes are saved as `.boq` files containing the JSON of a
//! [`QuoteSnapshot`]. Lock files use the `.boq.lock` extension.
//!
//! ## Example
//!
//! ```rust,no_run
//! use boq_core::file_io::{save_quote, load_quote, FileLock};
//! use boq_core::quote::QuoteSnapshot;
//! use std::path::Path;
//!
//! let quote = QuoteSnapshot::new("Bungalow", "Client", "Nairobi");
//! let path = Path::new("bungalow.boq");
//!
//! let lock = FileLock::acquire(path, "qs@company.com").unwrap();
//! save_quote(&quote, path).unwrap();
//! drop(lock);
//!
//! let loaded = load_quote(path).unwrap();
//! assert_eq!(loaded.meta.title, "Bungalow");
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use semver::Version;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{CalcError, CalcResult};
use crate::persist::QuoteSink;
use crate::quote::{QuoteSnapshot, SCHEMA_VERSION};

/// Lock file metadata stored in .boq.lock files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where the lock was taken
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a quote file, released on drop.
pub struct FileLock {
    quote_path: PathBuf,
    lock_path: PathBuf,
    /// Holds the OS lock
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock on `path`.
    ///
    /// Fails with [`CalcError::FileLocked`] while another live process
    /// holds it. Locks left by dead processes, or older than a day, are
    /// taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(existing) = live_lock(&lock_path) {
            return Err(CalcError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        // The holder's metadata stays intact until the OS lock is ours
        lock_file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;
        lock_file
            .set_len(0)
            .map_err(|e| io_error("truncate lock", &lock_path, e))?;

        let lock_json = serde_json::to_string_pretty(&info)?;
        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(|e| io_error("write lock", &lock_path, e))?;
        lock_file
            .sync_all()
            .map_err(|e| io_error("sync lock", &lock_path, e))?;

        debug!(path = %path.display(), user = %info.user_id, "acquired quote lock");
        Ok(FileLock {
            quote_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Holder of the lock on `path`, if any.
    pub fn check(path: &Path) -> Option<LockInfo> {
        live_lock(&lock_path_for(path))
    }

    pub fn quote_path(&self) -> &Path {
        &self.quote_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn io_error(operation: &str, path: &Path, err: std::io::Error) -> CalcError {
    CalcError::file_error(operation, path.display().to_string(), err.to_string())
}

fn lock_path_for(quote_path: &Path) -> PathBuf {
    let mut lock_path = quote_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn live_lock(lock_path: &Path) -> Option<LockInfo> {
    if !lock_path.exists() {
        return None;
    }
    read_json::<LockInfo>(lock_path)
        .ok()
        .filter(|info| !is_lock_stale(info))
}

fn is_lock_stale(info: &LockInfo) -> bool {
    if hostname().is_some_and(|ours| ours == info.machine) {
        #[cfg(windows)]
        {
            use std::process::Command;
            let output = Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                .output();
            if let Ok(output) = output {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                    return true;
                }
            }
        }
        #[cfg(unix)]
        {
            if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                return true;
            }
        }
    }

    (Utc::now() - info.locked_at).num_hours() > 24
}

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CalcResult<T> {
    let mut file = File::open(path).map_err(|e| io_error("open", path, e))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| io_error("read", path, e))?;
    serde_json::from_str(&contents)
        .map_err(|e| CalcError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))
}

/// Save a quote with atomic write semantics.
///
/// The JSON is written to `<path>.tmp`, synced, then renamed over `path`,
/// so an interrupted save never leaves a half-written quote.
pub fn save_quote(quote: &QuoteSnapshot, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(quote)?;
    let tmp_path = path.with_extension("boq.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;
    tmp_file
        .sync_all()
        .map_err(|e| io_error("sync temp file", &tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("rename to final", path, e)
    })?;

    info!(path = %path.display(), rows = quote.rows.len(), "saved quote");
    Ok(())
}

/// Load a quote, rejecting files from an incompatible schema.
pub fn load_quote(path: &Path) -> CalcResult<QuoteSnapshot> {
    let quote: QuoteSnapshot = read_json(path)?;
    validate_version(&quote.meta.version)?;
    debug!(path = %path.display(), rows = quote.rows.len(), "loaded quote");
    Ok(quote)
}

/// Load a quote along with the lock held on it, if any.
///
/// A quote locked by someone else should be treated as read-only.
pub fn load_quote_with_lock_check(path: &Path) -> CalcResult<(QuoteSnapshot, Option<LockInfo>)> {
    let quote = load_quote(path)?;
    Ok((quote, FileLock::check(path)))
}

/// Whether a file written at `file_version` can be read.
///
/// The major version must match; while the schema is 0.x, a file from a
/// newer minor version is rejected too.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let file = Version::parse(file_version.trim()).map_err(|_| mismatch())?;
    let current = Version::parse(SCHEMA_VERSION).map_err(|e| CalcError::Internal {
        message: format!("schema version {SCHEMA_VERSION} is not semver: {e}"),
    })?;

    if file.major != current.major {
        return Err(mismatch());
    }
    if current.major == 0 && file.minor > current.minor {
        return Err(mismatch());
    }
    Ok(())
}

/// [`QuoteSink`] writing each snapshot to one quote file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QuoteSink for FileSink {
    fn write(&mut self, snapshot: &QuoteSnapshot) -> CalcResult<()> {
        save_quote(snapshot, &self.path)
    }
}
