use std::path::PathBuf;

use tracing::warn;

use crate::client::StoreError;
use crate::data_types::RowId;
use crate::normalize::NormalizeError;
use crate::notify::Notifier;

/// Failures surfaced by the controllers. None of them is fatal: the affected
/// view keeps (or falls back to) its last known-good state.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Non-success status or network failure, with the endpoint it concerned
    #[error(transparent)]
    Transport(StoreError),

    /// Rejected locally, before anything was sent
    #[error("{reason}")]
    Validation { reason: String },

    #[error("{what} is not provided")]
    NotProvided { what: &'static str },

    #[error("Row {id} doesn't exist in the current table")]
    RowNotFound { id: RowId },

    #[error("Could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AdminError {
    pub fn validation(reason: impl Into<String>) -> Self {
        AdminError::Validation {
            reason: reason.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AdminError::Transport(_))
    }
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            // A payload that can't be re-keyed never left the client
            StoreError::Normalize(e) => e.into(),
            other => AdminError::Transport(other),
        }
    }
}

impl From<NormalizeError> for AdminError {
    fn from(err: NormalizeError) -> Self {
        AdminError::Validation {
            reason: err.to_string(),
        }
    }
}

pub type Result<T, E = AdminError> = std::result::Result<T, E>;

/// Log a failed operation and put it in front of the user.
pub(crate) fn report(notifier: &Notifier, operation: &str, err: AdminError) -> AdminError {
    warn!("{operation} failed: {err}");
    notifier.error(format!("{operation} failed: {err}"));
    err
}
