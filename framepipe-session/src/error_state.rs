//! Per-session last-failure record.

use crate::errors::{ErrorKind, SessionError};
use parking_lot::Mutex;

/// The most recent failure of the owning session.
///
/// Overwritten on every failing operation, never cleared by successes;
/// reads are side-effect free and valid in every session state.
#[derive(Debug, Default)]
pub(crate) struct ErrorState {
    last: Mutex<Option<(ErrorKind, String)>>,
}

impl ErrorState {
    pub(crate) fn record(&self, err: &SessionError) {
        *self.last.lock() = Some((err.kind(), err.to_string()));
    }

    /// Description of the most recent failure; empty when none has occurred.
    pub(crate) fn message(&self) -> String {
        self.last
            .lock()
            .as_ref()
            .map(|(_, msg)| msg.clone())
            .unwrap_or_default()
    }

    pub(crate) fn kind(&self) -> Option<ErrorKind> {
        self.last.lock().as_ref().map(|(kind, _)| *kind)
    }
}
