//! In-place fixpoint expansion of nested installer archives, with
//! deliverable location and repackaging support.
//!
//! ## Scope
//! This crate unpacks a self-extracting installer: it carves the embedded
//! ZIP payload out of the binary, repeatedly discovers and extracts nested
//! archives (ZIP and JAR) until the tree reaches a fixpoint, and then finds
//! the deliverable artifacts (cross-compiler, debug server, runtime
//! library, USB drivers) buried inside the expanded tree.
//!
//! ## Key invariants
//! - Termination is guaranteed: unextractable archives are skipped once and
//!   never retried within a run, and every run is bounded by an iteration
//!   cap.
//! - A source archive is deleted only after its extraction is verified.
//! - The driver is the sole writer of the subtree for a run's duration;
//!   extraction order within an iteration does not affect the final tree.
//!
//! ## Run flow
//! 1) Carve the payload ZIP out of the installer binary (`payload`).
//! 2) Expand the payload, then sweep JARs (namespaced) and ZIPs (flat) to a
//!    fixpoint, or run goal-directed until all deliverables appear
//!    (`expand`).
//! 3) Resolve deliverables with two-phase verified search (`locate`).
//! 4) Stage the installable layout and build the package (`assemble`).
//!
//! ## Notable entry points
//! - [`expand::FixpointDriver`]: the core loop, exhaustive or goal-directed.
//! - [`expand::ExpandConfig`]: sweep profiles (`zip_sweep`, `jar_sweep`).
//! - [`locate::locate_deliverables`]: resolve the built-in targets.
//! - [`payload::carve_payload`]: installer-binary to payload ZIP.
//! - [`progress::ProgressSink`]: structured progress, rendering kept out of
//!   the core.

pub mod assemble;
pub mod expand;
pub mod locate;
pub mod payload;
pub mod progress;

pub use expand::{
    ExpandConfig, ExpandError, FixpointDriver, RunSummary, SkipReason, TerminationState,
};
pub use locate::{locate_deliverables, DeliverableSet};
pub use payload::carve_payload;
pub use progress::{NullSink, ProgressEvent, ProgressSink, StderrSink, VecSink};
