//! Diagnostic sink for asset loading and audio start-up.
//!
//! Failures in these paths never stop a session; they are reported here and
//! the affected piece of the scene is simply absent.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::loader::LoadProgress;

/// One reported event
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    LoadProgress { path: PathBuf, progress: LoadProgress },
    LoadFailed { path: PathBuf, message: String },
    AudioUnavailable { message: String },
}

impl Diagnostic {
    pub fn is_failure(&self) -> bool {
        matches!(self, Diagnostic::LoadFailed { .. })
    }
}

/// Destination for [`Diagnostic`]s
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::LoadProgress { path, progress } => match progress.total_bytes {
                Some(total) => log::debug!(
                    "loading {}: {}/{} bytes",
                    path.display(),
                    progress.loaded_bytes,
                    total
                ),
                None => log::debug!("loading {}: {} bytes", path.display(), progress.loaded_bytes),
            },
            Diagnostic::LoadFailed { path, message } => {
                log::error!("failed to load {}: {}", path.display(), message)
            }
            Diagnostic::AudioUnavailable { message } => {
                log::warn!("audio unavailable, meter stays silent: {}", message)
            }
        }
    }
}

/// Keeps every diagnostic in memory and also logs it
///
/// Clones share the same record list.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    pub fn failures(&self) -> Vec<Diagnostic> {
        self.records
            .borrow()
            .iter()
            .filter(|d| d.is_failure())
            .cloned()
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        LogSink.report(diagnostic.clone());
        self.records.borrow_mut().push(diagnostic);
    }
}
