//! Two-phase deliverable search.
//!
//! # Algorithm
//! 1. Try the spec's fixed expected path under the root; a verified hit
//!    short-circuits the walk entirely.
//! 2. Otherwise walk the tree in deterministic name order, collect every
//!    verified candidate whose file name matches the spec's pattern, and
//!    pick the best by platform flavor. Ties within a flavor resolve to the
//!    first candidate in walk order.
//!
//! Side-effect free and idempotent: safe to call repeatedly while the tree
//! is still being expanded (it is the driver's goal predicate) and once
//! more at the end for reporting.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::spec::{builtin_specs, DeliverableSpec, PathFlavor};

/// Locate one deliverable. Returns `None` when nothing verifies.
pub fn locate(root: &Path, spec: &DeliverableSpec) -> Option<PathBuf> {
    let expected = root.join(&spec.expected);
    if spec.verified(&expected) {
        return Some(expected);
    }

    let mut best: Option<(PathFlavor, PathBuf)> = None;
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(OsStr::cmp);

    for result in builder.build() {
        let Ok(entry) = result else { continue };
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !spec.pattern.is_match(name) {
            continue;
        }
        let candidate = entry.path();
        if !spec.verified(candidate) {
            continue;
        }
        let rel = candidate.strip_prefix(root).unwrap_or(candidate);
        let flavor = PathFlavor::of_path(rel);
        let better = match &best {
            None => true,
            Some((best_flavor, _)) => flavor < *best_flavor,
        };
        if better {
            if flavor == PathFlavor::Linux {
                // Nothing outranks a Linux-flavored verified hit.
                return Some(candidate.to_path_buf());
            }
            best = Some((flavor, candidate.to_path_buf()));
        }
    }
    best.map(|(_, path)| path)
}

/// The resolved deliverables of one expanded tree.
///
/// A deliverable may legitimately be absent from a given installer version,
/// so every slot is optional.
#[derive(Clone, Debug, Default)]
pub struct DeliverableSet {
    pub compiler: Option<PathBuf>,
    pub debug_server: Option<PathBuf>,
    pub runtime_lib: Option<PathBuf>,
    pub usb_drivers: Option<PathBuf>,
}

impl DeliverableSet {
    pub fn is_complete(&self) -> bool {
        self.compiler.is_some()
            && self.debug_server.is_some()
            && self.runtime_lib.is_some()
            && self.usb_drivers.is_some()
    }

    /// Names of targets that did not resolve, in spec order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.compiler.is_none() {
            out.push("compiler");
        }
        if self.debug_server.is_none() {
            out.push("debug_server");
        }
        if self.runtime_lib.is_none() {
            out.push("runtime_lib");
        }
        if self.usb_drivers.is_none() {
            out.push("usb_drivers");
        }
        out
    }
}

/// Resolve the four built-in targets against `root`.
pub fn locate_deliverables(root: &Path) -> DeliverableSet {
    let specs = builtin_specs();
    let mut set = DeliverableSet::default();
    for spec in &specs {
        let found = locate(root, spec);
        match spec.name {
            "compiler" => set.compiler = found,
            "debug_server" => set.debug_server = found,
            "runtime_lib" => set.runtime_lib = found,
            "usb_drivers" => set.usb_drivers = found,
            _ => {}
        }
    }
    set
}
