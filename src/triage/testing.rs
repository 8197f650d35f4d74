use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{NotificationError, PersistenceError, SourceError};
use crate::notify::NotificationScheduler;
use crate::storage::KeyValueStore;
use crate::suggest::SuggestionSource;
use crate::triage::{Collaborators, NotificationId, Reminder};

#[derive(Default)]
pub(crate) struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    pub(crate) fail_writes: Mutex<bool>,
    pub(crate) fail_reads: Mutex<bool>,
}

impl MemoryStore {
    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub(crate) fn seed(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        if *self.fail_reads.lock() {
            return Err(PersistenceError::Backend("read refused".into()));
        }
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if *self.fail_writes.lock() {
            return Err(PersistenceError::Backend("write refused".into()));
        }
        self.seed(key, value);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingScheduler {
    next: Mutex<u32>,
    pending: Mutex<HashMap<NotificationId, Reminder>>,
    pub(crate) cancelled: Mutex<Vec<NotificationId>>,
    pub(crate) refuse_schedule: Mutex<bool>,
    pub(crate) refuse_cancel: Mutex<bool>,
}

impl RecordingScheduler {
    pub(crate) fn pending_for(&self, id: &NotificationId) -> Option<Reminder> {
        self.pending.lock().get(id).cloned()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl NotificationScheduler for RecordingScheduler {
    fn schedule(&self, reminder: &Reminder) -> Result<NotificationId, NotificationError> {
        if *self.refuse_schedule.lock() {
            return Err(NotificationError::PermissionDenied);
        }
        let mut next = self.next.lock();
        *next += 1;
        let id = NotificationId::new(format!("n{}", *next));
        self.pending.lock().insert(id.clone(), reminder.clone());
        Ok(id)
    }

    fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError> {
        if *self.refuse_cancel.lock() {
            return Err(NotificationError::Backend("cancel refused".into()));
        }
        self.pending.lock().remove(id);
        self.cancelled.lock().push(id.clone());
        Ok(())
    }
}

pub(crate) struct QueuedSource {
    responses: Mutex<Vec<Result<Vec<Reminder>, SourceError>>>,
}

impl QueuedSource {
    pub(crate) fn new(responses: Vec<Result<Vec<Reminder>, SourceError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    pub(crate) fn push(&self, response: Result<Vec<Reminder>, SourceError>) {
        self.responses.lock().push(response);
    }
}

impl SuggestionSource for QueuedSource {
    fn fetch_suggestions(&self) -> Result<Vec<Reminder>, SourceError> {
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(SourceError::Unavailable("no queued response".into()));
        }
        responses.remove(0)
    }
}

pub(crate) struct Fakes {
    pub(crate) storage: Arc<MemoryStore>,
    pub(crate) scheduler: Arc<RecordingScheduler>,
    pub(crate) source: Arc<QueuedSource>,
}

impl Fakes {
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStore::default()),
            scheduler: Arc::new(RecordingScheduler::default()),
            source: Arc::new(QueuedSource::new(Vec::new())),
        }
    }

    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            storage: self.storage.clone(),
            scheduler: self.scheduler.clone(),
            source: self.source.clone(),
        }
    }
}
