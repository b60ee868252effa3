//! Two-tier archive extraction.
//!
//! # Invariants
//! - The source archive is deleted only after extraction is verified; no
//!   code path removes it first.
//! - Entry paths are containment-checked; entries that would escape the
//!   destination are ignored.
//!
//! # Algorithm
//! 1. Structured extraction with the in-process ZIP reader.
//! 2. On structural corruption, fall back to the external `unzip` tool with
//!    a bounded timeout. A non-zero exit still counts as success if the
//!    destination gained entries that were not present before the attempt.
//! 3. If neither tier produces content, the archive is skipped (tolerant)
//!    or surfaced as a fatal error.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::ZipArchive;

use super::outcome::SkipReason;

/// Interval between liveness polls of the fallback tool.
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// External tolerant extractor invoked when the structured reader balks.
const FALLBACK_TOOL: &str = "unzip";

/// Where an archive's contents land.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationPolicy {
    /// Extract into the archive's parent directory (layer containers).
    Flat = 0,
    /// Extract into a sibling directory named after the archive with its
    /// final extension stripped (package containers).
    Namespaced = 1,
}

/// Outcome of one extraction attempt under corruption tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Contents are in place and the source archive was removed.
    Extracted { used_fallback: bool },
    /// Both tiers failed; the source archive is untouched.
    Skipped(SkipReason),
}

/// Fatal extraction failure, surfaced only when tolerance is disabled.
#[derive(Debug)]
pub struct ExtractError {
    pub archive: PathBuf,
    pub reason: SkipReason,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to extract {}: {}",
            self.archive.display(),
            self.reason
        )
    }
}

impl std::error::Error for ExtractError {}

/// Destination directory for `archive` under `policy`.
///
/// Namespaced destinations strip only the final extension, so `tools.pkg.jar`
/// maps to `tools.pkg/`.
pub fn destination_for(archive: &Path, policy: DestinationPolicy) -> PathBuf {
    let parent = archive.parent().unwrap_or_else(|| Path::new("."));
    match policy {
        DestinationPolicy::Flat => parent.to_path_buf(),
        DestinationPolicy::Namespaced => {
            let stem = archive.file_stem().unwrap_or_else(|| archive.as_os_str());
            parent.join(stem)
        }
    }
}

/// Extract `archive` in place and remove it on success.
///
/// Returns `Ok(Skipped)` for contained failures when `tolerant` is set and
/// `Err` otherwise. Contained failures leave the source archive on disk.
pub fn extract_archive(
    archive: &Path,
    policy: DestinationPolicy,
    tolerant: bool,
    tool_timeout: Duration,
) -> Result<ExtractOutcome, ExtractError> {
    let dest = destination_for(archive, policy);
    match try_extract(archive, &dest, tool_timeout) {
        Ok(used_fallback) => match fs::remove_file(archive) {
            Ok(()) => Ok(ExtractOutcome::Extracted { used_fallback }),
            // Contents are in place but the source could not be removed;
            // skip it so the driver never retries within this run.
            Err(_) => contain(archive, SkipReason::Io, tolerant),
        },
        Err(reason) => contain(archive, reason, tolerant),
    }
}

/// Extract `archive` into `dest` without touching the source file.
///
/// Used directly for the carved payload, which lands in a dedicated
/// directory and is deleted by the caller.
pub fn extract_into(archive: &Path, dest: &Path, tool_timeout: Duration) -> Result<bool, ExtractError> {
    fs::create_dir_all(dest).map_err(|_| ExtractError {
        archive: archive.to_path_buf(),
        reason: SkipReason::Io,
    })?;
    try_extract(archive, dest, tool_timeout).map_err(|reason| ExtractError {
        archive: archive.to_path_buf(),
        reason,
    })
}

fn contain(
    archive: &Path,
    reason: SkipReason,
    tolerant: bool,
) -> Result<ExtractOutcome, ExtractError> {
    if tolerant {
        Ok(ExtractOutcome::Skipped(reason))
    } else {
        Err(ExtractError {
            archive: archive.to_path_buf(),
            reason,
        })
    }
}

/// Run both extraction tiers. Returns whether the fallback tool was used.
fn try_extract(archive: &Path, dest: &Path, tool_timeout: Duration) -> Result<bool, SkipReason> {
    // Snapshot before any tier runs: the fallback's success test is "new
    // entries appeared", and the structured tier may leave partial output.
    let before = dir_entry_names(dest);

    match extract_structured(archive, dest) {
        Ok(()) => return Ok(false),
        Err(TierFailure::Io) => return Err(SkipReason::Io),
        Err(TierFailure::Corrupt) => {}
    }

    extract_with_fallback_tool(archive, dest, tool_timeout, &before)?;
    Ok(true)
}

enum TierFailure {
    /// Container is structurally unreadable; worth handing to the fallback.
    Corrupt,
    /// Plain I/O failure; the fallback would hit the same condition.
    Io,
}

fn classify_zip_error(err: &ZipError) -> TierFailure {
    match err {
        ZipError::Io(_) => TierFailure::Io,
        _ => TierFailure::Corrupt,
    }
}

/// Structured extraction with the in-process ZIP reader.
fn extract_structured(archive: &Path, dest: &Path) -> Result<(), TierFailure> {
    let file = File::open(archive).map_err(|_| TierFailure::Io)?;
    let mut reader = ZipArchive::new(file).map_err(|e| classify_zip_error(&e))?;

    for i in 0..reader.len() {
        let mut entry = reader.by_index(i).map_err(|e| classify_zip_error(&e))?;
        // Entries escaping the destination are ignored.
        let Some(rel) = entry.enclosed_name() else {
            continue;
        };
        let out = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|_| TierFailure::Io)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|_| TierFailure::Io)?;
        }
        let mut sink = File::create(&out).map_err(|_| TierFailure::Io)?;
        match io::copy(&mut entry, &mut sink) {
            Ok(_) => {}
            // Decompression failures mid-entry are container corruption.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Err(TierFailure::Corrupt),
            Err(_) => return Err(TierFailure::Io),
        }

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;

            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&out, Permissions::from_mode(mode));
            }
        }
    }
    Ok(())
}

/// Tolerant external extraction with a bounded wall-clock budget.
///
/// Some tools report non-zero status after successfully salvaging a
/// slightly malformed archive; the exit status alone is not trusted.
fn extract_with_fallback_tool(
    archive: &Path,
    dest: &Path,
    timeout: Duration,
    before: &HashSet<OsString>,
) -> Result<(), SkipReason> {
    let spawned = Command::new(FALLBACK_TOOL)
        .arg("-q")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SkipReason::FallbackToolMissing)
        }
        Err(_) => return Err(SkipReason::Io),
    };

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SkipReason::FallbackTimeout);
                }
                thread::sleep(FALLBACK_POLL_INTERVAL);
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SkipReason::Io);
            }
        }
    };

    if status.success() {
        return Ok(());
    }
    // Non-zero exit: accept only if the destination gained entries that were
    // not present before the attempt started.
    let after = dir_entry_names(dest);
    if after.difference(before).next().is_some() {
        Ok(())
    } else {
        Err(SkipReason::FallbackToolFailed)
    }
}

fn dir_entry_names(dir: &Path) -> HashSet<OsString> {
    let mut names = HashSet::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            names.insert(entry.file_name());
        }
    }
    names
}
