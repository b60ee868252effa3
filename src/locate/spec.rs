//! Deliverable target descriptions.
//!
//! # Invariants
//! - A spec's verification check distinguishes the genuine artifact from
//!   same-named decoys (documentation directories, placeholder files).
//! - Platform preference is total: Linux-flavored paths beat neutral paths,
//!   which beat Windows-flavored paths.

use std::path::{Path, PathBuf};

use regex::Regex;

/// Platform flavor of a candidate path, used as a preference rank.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathFlavor {
    Linux = 0,
    Neutral = 1,
    Windows = 2,
}

impl PathFlavor {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Neutral => "neutral",
            Self::Windows => "windows",
        }
    }

    /// Classify a path by its segments.
    ///
    /// A Linux segment anywhere wins over Windows markers, matching the
    /// search order of the original locator heuristics.
    pub fn of_path(path: &Path) -> Self {
        let mut windows = false;
        for component in path.components() {
            let seg = component.as_os_str().to_string_lossy();
            let seg = seg.to_ascii_lowercase();
            if seg == "lin" || seg.starts_with("linux") {
                return Self::Linux;
            }
            if seg.starts_with("win") || seg.ends_with(".exe") {
                windows = true;
            }
        }
        if windows {
            Self::Windows
        } else {
            Self::Neutral
        }
    }
}

/// How a candidate is confirmed to be the genuine artifact.
#[derive(Clone, Debug)]
pub enum VerifyCheck {
    /// Candidate must be a regular file.
    IsFile,
    /// Candidate must be a directory containing the given relative path.
    DirContains(String),
}

/// A named deliverable: where it is expected, how to search for it, and how
/// to verify a candidate.
#[derive(Clone, Debug)]
pub struct DeliverableSpec {
    /// Stable identifier used in reports.
    pub name: &'static str,
    /// Fixed relative path tried before any recursive search.
    pub expected: PathBuf,
    /// File-name pattern for the recursive search phase.
    pub pattern: Regex,
    /// Confirmation that a candidate is genuine.
    pub verify: VerifyCheck,
}

impl DeliverableSpec {
    /// Does `candidate` pass this spec's verification check?
    pub fn verified(&self, candidate: &Path) -> bool {
        match &self.verify {
            VerifyCheck::IsFile => candidate.is_file(),
            VerifyCheck::DirContains(rel) => {
                candidate.is_dir() && candidate.join(rel).exists()
            }
        }
    }
}

/// Installer layout prefix where deliverables are expected to surface.
const LAYOUT_PREFIX: &str = "C_/MakingInstalers/Layout";

/// The four artifacts the packaging step needs.
///
/// Expected paths reflect the known installer layout; patterns cover the
/// versioned directory names the recursive phase must match.
pub fn builtin_specs() -> Vec<DeliverableSpec> {
    let spec = |name, expected: String, pattern: &str, verify| DeliverableSpec {
        name,
        expected: PathBuf::from(expected),
        pattern: Regex::new(pattern).expect("builtin deliverable pattern"),
        verify,
    };

    vec![
        spec(
            "compiler",
            format!("{LAYOUT_PREFIX}/Cross_Tools_zg_ia_sf/powerpc-eabivle-4_9"),
            r"^powerpc-eabivle-4_9$",
            VerifyCheck::DirContains("bin/powerpc-eabivle-gcc".to_string()),
        ),
        spec(
            "debug_server",
            format!(
                "{LAYOUT_PREFIX}/eclipse_zg_ia_sf/plugins/com.pemicro.debug.gdbjtag.ppc_1.7.2.201709281658/lin"
            ),
            r"^lin$",
            VerifyCheck::DirContains("pegdbserver_power_console".to_string()),
        ),
        spec(
            "runtime_lib",
            format!("{LAYOUT_PREFIX}/S32DS_zg_ia_sf/e200_ewl2"),
            r"^e200_ewl2$",
            VerifyCheck::DirContains("EWL_C".to_string()),
        ),
        spec(
            "usb_drivers",
            format!("{LAYOUT_PREFIX}/Drivers_zg_ia_sf/libusb_64_32"),
            r"^libusb_64_32$",
            VerifyCheck::DirContains("58-pemicro.rules".to_string()),
        ),
    ]
}
