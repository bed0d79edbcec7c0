//! Recording collaborators for testing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::call_trace::CallTrace;
use crate::collaborators::{DerivedFileCoordinator, ThirdPartyNotifier};
use crate::error::ArtefactError;
use crate::metadata::{Artefact, ArtefactId, Language, ListType};

/// Records derived-file cleanups into a shared trace
#[derive(Default)]
pub struct RecordingDerivedFiles {
    trace: CallTrace,
    removed: Mutex<Vec<(ArtefactId, ListType, Language)>>,
    fail: AtomicBool,
}

impl RecordingDerivedFiles {
    pub fn with_trace(trace: CallTrace) -> Self {
        Self {
            trace,
            ..Self::default()
        }
    }

    /// Make every following `remove` call fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn removed(&self) -> Vec<(ArtefactId, ListType, Language)> {
        self.removed.lock().unwrap().clone()
    }
}

impl DerivedFileCoordinator for RecordingDerivedFiles {
    fn remove(&self, id: ArtefactId, list_type: ListType, language: Language) -> Result<(), ArtefactError> {
        self.trace.record(format!("derived.remove:{}", id));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ArtefactError::Collaborator("renderer unavailable".to_string()));
        }
        self.removed.lock().unwrap().push((id, list_type, language));
        Ok(())
    }
}

/// Records third-party announcements into a shared trace
#[derive(Default)]
pub struct RecordingNotifier {
    trace: CallTrace,
    notified: Mutex<Vec<Artefact>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn with_trace(trace: CallTrace) -> Self {
        Self {
            trace,
            ..Self::default()
        }
    }

    /// Make every following announcement fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn notified(&self) -> Vec<Artefact> {
        self.notified.lock().unwrap().clone()
    }
}

impl ThirdPartyNotifier for RecordingNotifier {
    fn notify_deleted(&self, artefact: &Artefact) -> Result<(), ArtefactError> {
        let id = artefact.id.map(|id| id.to_string()).unwrap_or_default();
        self.trace.record(format!("notifier.deleted:{}", id));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ArtefactError::Collaborator("third party unreachable".to_string()));
        }
        self.notified.lock().unwrap().push(artefact.clone());
        Ok(())
    }
}
