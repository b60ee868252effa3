//! Progress reporting decoupled from the expansion core.
//!
//! # Design
//! The driver emits structured events; rendering is the caller's concern.
//! The CLI renders to stderr, tests capture into a vec, and library callers
//! that want silence pass [`NullSink`].

use std::path::Path;

use crate::expand::driver::RunSummary;
use crate::expand::outcome::SkipReason;

/// One observable moment in an expansion run.
#[derive(Clone, Copy, Debug)]
pub enum ProgressEvent<'a> {
    IterationStarted {
        iteration: u32,
        candidates: usize,
    },
    ArchiveExtracted {
        path: &'a Path,
        used_fallback: bool,
    },
    ArchiveSkipped {
        path: &'a Path,
        reason: SkipReason,
    },
    RunFinished {
        summary: &'a RunSummary,
    },
}

/// Receiver for [`ProgressEvent`]s.
pub trait ProgressSink {
    fn event(&mut self, event: ProgressEvent<'_>);
}

/// Discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn event(&mut self, _event: ProgressEvent<'_>) {}
}

/// Renders events as human-readable lines on stderr.
pub struct StderrSink;

impl ProgressSink for StderrSink {
    fn event(&mut self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::IterationStarted {
                iteration,
                candidates,
            } => {
                eprintln!("iteration {iteration}: {candidates} archive(s) found");
            }
            ProgressEvent::ArchiveExtracted {
                path,
                used_fallback,
            } => {
                if used_fallback {
                    eprintln!("  extracted (fallback tool): {}", path.display());
                } else {
                    eprintln!("  extracted: {}", path.display());
                }
            }
            ProgressEvent::ArchiveSkipped { path, reason } => {
                eprintln!("  skipped ({reason}): {}", path.display());
            }
            ProgressEvent::RunFinished { summary } => {
                eprintln!("{summary}");
            }
        }
    }
}

/// Captures rendered event lines for assertions in tests.
#[derive(Default)]
pub struct VecSink {
    pub lines: Vec<String>,
}

impl ProgressSink for VecSink {
    fn event(&mut self, event: ProgressEvent<'_>) {
        let line = match event {
            ProgressEvent::IterationStarted {
                iteration,
                candidates,
            } => format!("iteration {iteration}: {candidates}"),
            ProgressEvent::ArchiveExtracted {
                path,
                used_fallback,
            } => format!(
                "extracted fallback={} {}",
                used_fallback,
                path.display()
            ),
            ProgressEvent::ArchiveSkipped { path, reason } => {
                format!("skipped {} {}", reason, path.display())
            }
            ProgressEvent::RunFinished { summary } => {
                format!("finished {}", summary.state.name())
            }
        };
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_captures_lines() {
        let mut sink = VecSink::default();
        sink.event(ProgressEvent::IterationStarted {
            iteration: 1,
            candidates: 3,
        });
        sink.event(ProgressEvent::ArchiveSkipped {
            path: Path::new("bad.zip"),
            reason: SkipReason::CorruptArchive,
        });
        assert_eq!(
            sink.lines,
            vec![
                "iteration 1: 3".to_string(),
                "skipped corrupt_archive bad.zip".to_string()
            ]
        );
    }
}
