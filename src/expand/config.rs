//! Expansion sweep policy and hard limits.
//!
//! # Invariants
//! - `iteration_cap` is a hard bound on fixpoint rounds and must be > 0.
//! - Extension matching is case-sensitive; every extension carries its dot.
//! - Exclusion patterns are plain substrings matched against file names.
//!
//! # Design Notes
//! - Defaults mirror the two sweep profiles the installer workflow needs:
//!   a flat ZIP sweep and a namespaced JAR sweep.
//! - Validation is cheap and should run once, when the driver is built.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::extract::DestinationPolicy;

/// Default bound on one external-tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Payload file name that must never be re-swept once carved.
pub const PAYLOAD_FILE_NAME: &str = "installer_payload.zip";

/// Policy for one expansion sweep over a directory tree.
///
/// A sweep repeatedly discovers files whose names end with one of
/// `extensions`, extracts them according to `destination`, and removes the
/// source on success. Archives that fail both extraction tiers are skipped
/// permanently for the rest of the run when `corruption_tolerant` is set,
/// and abort the run otherwise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpandConfig {
    /// File-name suffixes treated as archives (case-sensitive, with dot).
    pub extensions: Vec<String>,

    /// Substrings that disqualify a file name from extraction.
    pub exclude_patterns: Vec<String>,

    /// Maximum number of scan+extract rounds before giving up.
    pub iteration_cap: u32,

    /// Skip unextractable archives instead of failing the run.
    pub corruption_tolerant: bool,

    /// Where extracted contents land relative to the archive.
    pub destination: DestinationPolicy,

    /// Wall-clock bound for one fallback-tool invocation.
    #[serde(with = "timeout_secs")]
    pub tool_timeout: Duration,
}

/// Validation error returned by [`ExpandConfig::validate`].
///
/// Callers should treat this as a configuration bug, not hostile input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpandConfigError {
    NoExtensions,
    ExtensionMissingDot(String),
    IterationCapZero,
    ToolTimeoutZero,
}

impl fmt::Display for ExpandConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExtensions => write!(f, "extension set must not be empty"),
            Self::ExtensionMissingDot(ext) => {
                write!(f, "extension {ext:?} must start with a dot")
            }
            Self::IterationCapZero => write!(f, "iteration_cap must be > 0"),
            Self::ToolTimeoutZero => write!(f, "tool_timeout must be > 0"),
        }
    }
}

impl std::error::Error for ExpandConfigError {}

impl ExpandConfig {
    /// Flat ZIP sweep: unpack layer archives into their parent directory.
    ///
    /// The carved payload file is excluded so the sweep never re-extracts it.
    pub fn zip_sweep() -> Self {
        Self {
            extensions: vec![".zip".to_string()],
            exclude_patterns: vec![PAYLOAD_FILE_NAME.to_string()],
            iteration_cap: 100,
            corruption_tolerant: true,
            destination: DestinationPolicy::Flat,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Namespaced JAR sweep: unpack package archives into derived directories.
    pub fn jar_sweep() -> Self {
        Self {
            extensions: vec![".jar".to_string()],
            exclude_patterns: Vec::new(),
            iteration_cap: 200,
            corruption_tolerant: true,
            destination: DestinationPolicy::Namespaced,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Combined sweep for goal-directed runs: both archive families at once.
    pub fn goal_sweep() -> Self {
        Self {
            extensions: vec![".zip".to_string(), ".jar".to_string()],
            exclude_patterns: vec![PAYLOAD_FILE_NAME.to_string()],
            iteration_cap: 200,
            corruption_tolerant: true,
            destination: DestinationPolicy::Flat,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<(), ExpandConfigError> {
        if self.extensions.is_empty() {
            return Err(ExpandConfigError::NoExtensions);
        }
        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(ExpandConfigError::ExtensionMissingDot(ext.clone()));
            }
        }
        if self.iteration_cap == 0 {
            return Err(ExpandConfigError::IterationCapZero);
        }
        if self.tool_timeout.is_zero() {
            return Err(ExpandConfigError::ToolTimeoutZero);
        }
        Ok(())
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
