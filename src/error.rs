use thiserror::Error;

use crate::triage::ReminderId;

/// The suggestion source could not produce a list.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("suggestion source unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value storage failed to read or write.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend failed: {0}")]
    Backend(String),
    #[error("encoding stored value for {key}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("decoding stored value for {key}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification permission was denied")]
    PermissionDenied,
    #[error("notifications are disabled in the configuration")]
    Disabled,
    #[error("notification backend failed: {0}")]
    Backend(String),
}

/// Errors a triage operation reports back to its caller.
///
/// Persistence and notification failures are absorbed by the store and never
/// appear here.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("no suggestion with id {0}")]
    UnknownSuggestion(ReminderId),
    #[error("no upcoming reminder with id {0}")]
    UnknownUpcoming(ReminderId),
    #[error("cannot snooze by {0} minutes")]
    InvalidSnooze(i64),
    #[error("dismissed suggestion {id} cannot be restored")]
    UnsupportedUndo { id: ReminderId },
}

pub type TriageResult<T> = Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_undo_names_the_dismissed_id() {
        let err = TriageError::UnsupportedUndo {
            id: ReminderId::new("demo-42"),
        };
        assert_eq!(
            err.to_string(),
            "dismissed suggestion demo-42 cannot be restored"
        );
    }

    #[test]
    fn source_errors_pass_through_transparently() {
        let err: TriageError = SourceError::Unavailable("offline".into()).into();
        assert_eq!(err.to_string(), "suggestion source unavailable: offline");
    }
}
