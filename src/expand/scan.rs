//! Candidate-archive discovery.
//!
//! # Scope
//! Walks a directory subtree and returns every regular file whose name ends
//! with a configured archive extension, minus exclusions and
//! version-control metadata.
//!
//! # Design Notes
//! - Suffix matching is case-sensitive; the sweep profiles own the policy.
//! - A directory that vanishes mid-walk (racing with extraction in the same
//!   process) is silently omitted, not an error.
//! - Walk order is made deterministic by name so downstream tie-breaks are
//!   reproducible, although the fixpoint does not depend on it.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};

use super::config::ExpandConfig;

/// Directory names whose subtrees are never scanned.
const VCS_DIRS: [&str; 3] = [".git", ".svn", ".hg"];

/// Return every candidate archive under `root` for this sweep.
///
/// No side effects. Files are matched by name only; content sniffing is the
/// extractor's job.
pub fn scan_archives(root: &Path, config: &ExpandConfig) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(OsStr::cmp)
        .filter_entry(keep_entry);

    let mut archives = Vec::new();
    for result in builder.build() {
        // Vanished directories and unreadable entries are dropped.
        let Ok(entry) = result else { continue };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if matches_extension(name, &config.extensions) && !is_excluded(name, &config.exclude_patterns)
        {
            archives.push(entry.into_path());
        }
    }
    archives
}

fn keep_entry(entry: &DirEntry) -> bool {
    if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
        return true;
    }
    match entry.file_name().to_str() {
        Some(name) => !VCS_DIRS.contains(&name),
        None => true,
    }
}

/// Case-sensitive suffix match against the configured extension set.
pub(crate) fn matches_extension(name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Substring exclusion match against the file name.
pub(crate) fn is_excluded(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pat| name.contains(pat.as_str()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::expand::config::ExpandConfig;

    #[test]
    fn suffix_match_is_case_sensitive() {
        let exts = vec![".zip".to_string(), ".jar".to_string()];
        assert!(matches_extension("bundle.zip", &exts));
        assert!(matches_extension("plugin.jar", &exts));
        assert!(!matches_extension("bundle.ZIP", &exts));
        assert!(!matches_extension("archive.tar", &exts));
    }

    #[test]
    fn exclusion_is_substring_based() {
        let pats = vec!["installer_payload.zip".to_string(), "_skip_".to_string()];
        assert!(is_excluded("installer_payload.zip", &pats));
        assert!(is_excluded("part_skip_two.zip", &pats));
        assert!(!is_excluded("layout.zip", &pats));
    }

    #[test]
    fn scan_finds_nested_archives_and_prunes_vcs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join("top.zip"), b"x").unwrap();
        fs::write(root.join("a/b/deep.zip"), b"x").unwrap();
        fs::write(root.join("a/readme.txt"), b"x").unwrap();
        fs::write(root.join(".git/objects/fake.zip"), b"x").unwrap();
        fs::write(root.join("installer_payload.zip"), b"x").unwrap();

        let found = scan_archives(root, &ExpandConfig::zip_sweep());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a/b/deep.zip".to_string(), "top.zip".to_string()]);
    }

    #[test]
    fn scan_of_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("nope");
        assert!(scan_archives(&gone, &ExpandConfig::zip_sweep()).is_empty());
    }
}
