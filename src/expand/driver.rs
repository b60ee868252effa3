//! The fixpoint expansion loop.
//!
//! # State machine
//! `Scanning -> Extracting -> Scanning -> ...` until a terminal state:
//! - `Converged`: the goal predicate held (goal-directed policy only).
//! - `Exhausted`: no candidates remained after skip-set subtraction.
//! - `CapReached`: the iteration cap was hit.
//! - `Stopped`: an external cancel flag was raised between iterations.
//!
//! One iteration is a single [`FixpointDriver::step`] call, so iteration
//! semantics are unit-testable without driving a whole run.
//!
//! # Invariants
//! - A path in the skip set is never re-attempted within the same run.
//! - Per-archive failures are contained in the skip set and never abort the
//!   loop; only an invalid root (or a failure under disabled tolerance)
//!   propagates.
//! - The goal is evaluated before scanning, so a goal satisfied by the
//!   initial tree costs zero extraction work.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::config::{ExpandConfig, ExpandConfigError};
use super::extract::{extract_archive, ExtractError, ExtractOutcome};
use super::outcome::RunStats;
use super::scan::scan_archives;
use crate::progress::{ProgressEvent, ProgressSink};

/// Terminal state of an expansion run.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminationState {
    /// Goal predicate satisfied (goal-directed policy only).
    Converged = 0,
    /// No unskipped candidates remained.
    Exhausted = 1,
    /// Iteration cap hit with candidates still outstanding.
    CapReached = 2,
    /// External cancel flag raised at the scanning boundary.
    Stopped = 3,
}

impl TerminationState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::CapReached => "cap_reached",
            Self::Stopped => "stopped",
        }
    }
}

/// Structured result of one expansion run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub state: TerminationState,
    pub iterations: u32,
    pub extracted: u64,
    pub skipped: u64,
    pub stats: RunStats,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state={} iterations={} extracted={} skipped={}",
            self.state.name(),
            self.iterations,
            self.extracted,
            self.skipped
        )?;
        if self.skipped != 0 {
            writeln!(f)?;
            self.stats.fmt_reason_table(f)?;
        }
        Ok(())
    }
}

/// Hard failure of an expansion run.
#[derive(Debug)]
pub enum ExpandError {
    RootNotFound(PathBuf),
    RootNotDirectory(PathBuf),
    /// Extraction failure with corruption tolerance disabled.
    Extraction(ExtractError),
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound(p) => write!(f, "root does not exist: {}", p.display()),
            Self::RootNotDirectory(p) => write!(f, "root is not a directory: {}", p.display()),
            Self::Extraction(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExpandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Extraction(e) => Some(e),
            _ => None,
        }
    }
}

/// Working state owned by exactly one run.
#[derive(Clone, Debug, Default)]
pub struct RunState {
    pub iterations: u32,
    pub stats: RunStats,
    skip_set: HashSet<PathBuf>,
}

impl RunState {
    #[inline]
    pub fn skip_set_len(&self) -> usize {
        self.skip_set.len()
    }
}

/// Goal predicate over the current state of the expanded tree.
pub type GoalPredicate<'a> = &'a dyn Fn(&Path) -> bool;

/// Drives [`scan_archives`] and [`extract_archive`] to a fixpoint.
pub struct FixpointDriver {
    config: ExpandConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl FixpointDriver {
    /// Build a driver, validating the configuration up front.
    pub fn new(config: ExpandConfig) -> Result<Self, ExpandConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    pub fn config(&self) -> &ExpandConfig {
        &self.config
    }

    /// Honor `flag` between iterations (checked at the scanning boundary).
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Exhaustive policy: expand until no candidate archives remain.
    pub fn run(
        &self,
        root: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<RunSummary, ExpandError> {
        self.run_inner(root, None, sink)
    }

    /// Goal-directed policy: stop as soon as `goal` holds over the tree.
    pub fn run_until(
        &self,
        root: &Path,
        goal: GoalPredicate<'_>,
        sink: &mut dyn ProgressSink,
    ) -> Result<RunSummary, ExpandError> {
        self.run_inner(root, Some(goal), sink)
    }

    fn run_inner(
        &self,
        root: &Path,
        goal: Option<GoalPredicate<'_>>,
        sink: &mut dyn ProgressSink,
    ) -> Result<RunSummary, ExpandError> {
        check_root(root)?;

        let mut state = RunState::default();
        let terminal = loop {
            if let Some(terminal) = self.step(root, &mut state, goal, sink)? {
                break terminal;
            }
        };

        let summary = RunSummary {
            state: terminal,
            iterations: state.iterations,
            extracted: state.stats.archives_extracted,
            skipped: state.stats.archives_skipped,
            stats: state.stats,
        };
        sink.event(ProgressEvent::RunFinished { summary: &summary });
        Ok(summary)
    }

    /// One `Scanning -> Extracting` transition.
    ///
    /// Returns `Some(terminal)` when the run is over, `None` to continue.
    /// Exposed so a single iteration can be tested in isolation.
    pub fn step(
        &self,
        root: &Path,
        state: &mut RunState,
        goal: Option<GoalPredicate<'_>>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<TerminationState>, ExpandError> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Ok(Some(TerminationState::Stopped));
            }
        }
        // Goal first: a goal satisfied by the initial tree must not trigger
        // any scanning or extraction.
        if let Some(goal) = goal {
            if goal(root) {
                return Ok(Some(TerminationState::Converged));
            }
        }

        let mut candidates = scan_archives(root, &self.config);
        candidates.retain(|path| !state.skip_set.contains(path));
        if candidates.is_empty() {
            return Ok(Some(TerminationState::Exhausted));
        }

        sink.event(ProgressEvent::IterationStarted {
            iteration: state.iterations + 1,
            candidates: candidates.len(),
        });

        for archive in &candidates {
            let outcome = extract_archive(
                archive,
                self.config.destination,
                self.config.corruption_tolerant,
                self.config.tool_timeout,
            )
            .map_err(ExpandError::Extraction)?;

            match outcome {
                ExtractOutcome::Extracted { used_fallback } => {
                    state.stats.record_extracted(used_fallback);
                    sink.event(ProgressEvent::ArchiveExtracted {
                        path: archive,
                        used_fallback,
                    });
                }
                ExtractOutcome::Skipped(reason) => {
                    state.stats.record_skipped(reason);
                    state.skip_set.insert(archive.clone());
                    sink.event(ProgressEvent::ArchiveSkipped {
                        path: archive,
                        reason,
                    });
                }
            }
        }

        state.iterations += 1;
        if state.iterations == self.config.iteration_cap {
            return Ok(Some(TerminationState::CapReached));
        }
        Ok(None)
    }
}

fn check_root(root: &Path) -> Result<(), ExpandError> {
    match root.metadata() {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ExpandError::RootNotDirectory(root.to_path_buf())),
        Err(_) => Err(ExpandError::RootNotFound(root.to_path_buf())),
    }
}
