use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{AppConfig, DEFAULT_UPCOMING_KEY};
use crate::error::{PersistenceError, TriageError, TriageResult};
use crate::notify::NotificationScheduler;
use crate::storage::KeyValueStore;
use crate::suggest::SuggestionSource;
use crate::triage::model::{sort_by_when, NotificationId, Reminder, ReminderId};
use crate::triage::undo::{
    ActionKind, ActionRecord, UndoController, UndoState, DEFAULT_UNDO_WINDOW,
};

/// External services the store talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn KeyValueStore>,
    pub scheduler: Arc<dyn NotificationScheduler>,
    pub source: Arc<dyn SuggestionSource>,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub storage_key: String,
    pub undo_window: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_UPCOMING_KEY.to_string(),
            undo_window: DEFAULT_UNDO_WINDOW,
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            storage_key: config.storage.upcoming_key.clone(),
            undo_window: config.undo.window(),
        }
    }
}

/// Owns the suggestion and upcoming lists plus the undo log for one screen.
///
/// Every mutation runs to completion before returning. Notification and
/// persistence failures are logged and absorbed; they never fail an operation.
pub struct ReminderStore {
    suggestions: Vec<Reminder>,
    upcoming: Vec<Reminder>,
    undo: UndoController,
    storage_key: String,
    services: Collaborators,
}

impl ReminderStore {
    /// Builds the store and restores `upcoming` from durable storage.
    pub fn mount(services: Collaborators, options: StoreOptions) -> Self {
        let upcoming = restore_upcoming(services.storage.as_ref(), &options.storage_key);
        tracing::info!(upcoming = upcoming.len(), "reminder store mounted");
        Self {
            suggestions: Vec::new(),
            upcoming,
            undo: UndoController::new(options.undo_window),
            storage_key: options.storage_key,
            services,
        }
    }

    pub fn suggestions(&self) -> &[Reminder] {
        &self.suggestions
    }

    pub fn upcoming(&self) -> &[Reminder] {
        &self.upcoming
    }

    pub fn undo_state(&self) -> UndoState {
        self.undo.state()
    }

    pub fn pending_undo(&self) -> Option<&ActionRecord> {
        self.undo.pending()
    }

    /// Replaces `suggestions` with a fresh batch from the source. On failure
    /// the current list stays as it was.
    pub fn load_suggestions(&mut self) -> TriageResult<usize> {
        let batch = match self.services.source.fetch_suggestions() {
            Ok(batch) => batch,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load suggestions");
                return Err(TriageError::Source(err));
            }
        };

        let mut fresh: Vec<Reminder> = Vec::with_capacity(batch.len());
        for candidate in batch {
            if self.upcoming_index(&candidate.id).is_some() {
                tracing::debug!(id = %candidate.id, "suggestion already upcoming, skipping");
                continue;
            }
            if fresh.iter().any(|existing| existing.id == candidate.id) {
                tracing::debug!(id = %candidate.id, "duplicate suggestion id, skipping");
                continue;
            }
            fresh.push(candidate.detached());
        }
        self.suggestions = fresh;
        tracing::info!(count = self.suggestions.len(), "suggestions loaded");
        Ok(self.suggestions.len())
    }

    /// Moves a suggestion into `upcoming`, scheduling its notification when the
    /// scheduler allows it. Returns the item as stored.
    pub fn accept(&mut self, id: &ReminderId) -> TriageResult<Reminder> {
        let index = self
            .suggestion_index(id)
            .ok_or_else(|| TriageError::UnknownSuggestion(id.clone()))?;
        let mut item = self.suggestions[index].detached();
        item.notification_id = self.try_schedule(&item);

        self.suggestions.retain(|candidate| candidate.id != item.id);
        self.place_upcoming(item.clone());
        self.persist_upcoming();
        self.arm(ActionRecord::Accept { item: item.clone() });
        Ok(item)
    }

    pub fn dismiss(&mut self, id: &ReminderId) -> TriageResult<()> {
        let index = self
            .suggestion_index(id)
            .ok_or_else(|| TriageError::UnknownSuggestion(id.clone()))?;
        self.suggestions.remove(index);
        self.arm(ActionRecord::Dismiss { id: id.clone() });
        Ok(())
    }

    pub fn remove_upcoming(&mut self, id: &ReminderId) -> TriageResult<Reminder> {
        let index = self
            .upcoming_index(id)
            .ok_or_else(|| TriageError::UnknownUpcoming(id.clone()))?;
        let notification = self.upcoming[index].notification_id.clone();
        self.try_cancel(notification.as_ref());

        let Some(index) = self.upcoming_index(id) else {
            return Err(TriageError::UnknownUpcoming(id.clone()));
        };
        let item = self.upcoming.remove(index);
        self.persist_upcoming();
        self.arm(ActionRecord::Remove { item: item.clone() });
        Ok(item)
    }

    /// Pushes an upcoming reminder `minutes` later and reschedules it.
    pub fn snooze(&mut self, id: &ReminderId, minutes: i64) -> TriageResult<Reminder> {
        if minutes <= 0 {
            return Err(TriageError::InvalidSnooze(minutes));
        }
        let index = self
            .upcoming_index(id)
            .ok_or_else(|| TriageError::UnknownUpcoming(id.clone()))?;
        let current = self.upcoming[index].clone();
        let new_when = minutes
            .checked_mul(60)
            .map(time::Duration::seconds)
            .and_then(|offset| current.when.checked_add(offset))
            .ok_or(TriageError::InvalidSnooze(minutes))?;

        self.try_cancel(current.notification_id.as_ref());
        let mut updated = current.detached();
        updated.when = new_when;
        updated.notification_id = self.try_schedule(&updated);

        self.place_upcoming(updated.clone());
        self.persist_upcoming();
        self.arm(ActionRecord::Snooze {
            item: updated.clone(),
            previous_when: current.when,
        });
        Ok(updated)
    }

    /// Replaces the upcoming reminder sharing `after.id` with `after`.
    ///
    /// Any notification handle on `after` is ignored; a fresh one is scheduled.
    pub fn edit(&mut self, after: Reminder) -> TriageResult<Reminder> {
        let index = self
            .upcoming_index(&after.id)
            .ok_or_else(|| TriageError::UnknownUpcoming(after.id.clone()))?;
        let before = self.upcoming[index].clone();

        self.try_cancel(before.notification_id.as_ref());
        let mut updated = after.detached();
        updated.notification_id = self.try_schedule(&updated);

        self.place_upcoming(updated.clone());
        self.persist_upcoming();
        self.arm(ActionRecord::Edit {
            before,
            after: updated.clone(),
        });
        Ok(updated)
    }

    pub fn undo(&mut self) -> TriageResult<Option<ActionKind>> {
        self.undo_at(Instant::now())
    }

    /// Inverts the live undo record, if any. Returns the kind that was undone.
    /// Undoing a dismissal clears the record and reports `UnsupportedUndo`.
    pub fn undo_at(&mut self, now: Instant) -> TriageResult<Option<ActionKind>> {
        let Some(record) = self.undo.take_at(now) else {
            return Ok(None);
        };
        let kind = record.kind();
        tracing::info!(%kind, id = %record.reminder_id(), "undoing action");

        match record {
            ActionRecord::Accept { item } => {
                if let Some(index) = self.upcoming_index(&item.id) {
                    let current = self.upcoming.remove(index);
                    self.try_cancel(current.notification_id.as_ref());
                }
                self.suggestions.retain(|candidate| candidate.id != item.id);
                self.suggestions.insert(0, item.detached());
                self.persist_upcoming();
            }
            ActionRecord::Dismiss { id } => {
                return Err(TriageError::UnsupportedUndo { id });
            }
            ActionRecord::Remove { item } => {
                self.suggestions.retain(|candidate| candidate.id != item.id);
                let mut restored = item.detached();
                restored.notification_id = self.try_schedule(&restored);
                self.place_upcoming(restored);
                self.persist_upcoming();
            }
            ActionRecord::Snooze {
                item,
                previous_when,
            } => {
                let Some(index) = self.upcoming_index(&item.id) else {
                    tracing::warn!(id = %item.id, "snoozed reminder vanished before undo");
                    return Ok(Some(kind));
                };
                let current = self.upcoming[index].clone();
                self.try_cancel(current.notification_id.as_ref());
                let mut restored = current.detached();
                restored.when = previous_when;
                restored.notification_id = self.try_schedule(&restored);
                self.place_upcoming(restored);
                self.persist_upcoming();
            }
            ActionRecord::Edit { before, after } => {
                let Some(index) = self.upcoming_index(&after.id) else {
                    tracing::warn!(id = %after.id, "edited reminder vanished before undo");
                    return Ok(Some(kind));
                };
                let current = self.upcoming[index].clone();
                self.try_cancel(current.notification_id.as_ref());
                let mut restored = before.detached();
                restored.notification_id = self.try_schedule(&restored);
                self.place_upcoming(restored);
                self.persist_upcoming();
            }
        }
        Ok(Some(kind))
    }

    pub fn expire_undo(&mut self) -> Option<ActionKind> {
        self.expire_undo_at(Instant::now())
    }

    /// Disarms the undo record once its window has closed.
    pub fn expire_undo_at(&mut self, now: Instant) -> Option<ActionKind> {
        self.undo.expire_at(now).map(|record| record.kind())
    }

    fn arm(&mut self, record: ActionRecord) {
        if let Some(superseded) = self.undo.arm(record) {
            tracing::debug!(kind = %superseded.kind(), "pending undo superseded");
        }
    }

    fn suggestion_index(&self, id: &ReminderId) -> Option<usize> {
        self.suggestions.iter().position(|item| &item.id == id)
    }

    fn upcoming_index(&self, id: &ReminderId) -> Option<usize> {
        self.upcoming.iter().position(|item| &item.id == id)
    }

    /// Inserts or replaces by id, then restores ascending `when` order.
    fn place_upcoming(&mut self, item: Reminder) {
        match self.upcoming_index(&item.id) {
            Some(index) => self.upcoming[index] = item,
            None => self.upcoming.push(item),
        }
        sort_by_when(&mut self.upcoming);
    }

    fn try_schedule(&self, item: &Reminder) -> Option<NotificationId> {
        match self.services.scheduler.schedule(item) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(id = %item.id, error = %err, "continuing without a notification");
                None
            }
        }
    }

    fn try_cancel(&self, notification: Option<&NotificationId>) {
        let Some(notification) = notification else {
            return;
        };
        if let Err(err) = self.services.scheduler.cancel(notification) {
            tracing::warn!(%notification, error = %err, "failed to cancel notification");
        }
    }

    fn persist_upcoming(&self) {
        let encoded = match serde_json::to_string(&self.upcoming) {
            Ok(encoded) => encoded,
            Err(source) => {
                let err = PersistenceError::Encode {
                    key: self.storage_key.clone(),
                    source,
                };
                tracing::warn!(error = %err, "upcoming reminders not persisted");
                return;
            }
        };
        if let Err(err) = self.services.storage.set(&self.storage_key, &encoded) {
            tracing::warn!(error = %err, "upcoming reminders not persisted");
        }
    }
}

fn restore_upcoming(storage: &dyn KeyValueStore, key: &str) -> Vec<Reminder> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read persisted upcoming reminders");
            return Vec::new();
        }
    };
    let decoded: Vec<Reminder> = match serde_json::from_str(&raw) {
        Ok(decoded) => decoded,
        Err(source) => {
            let err = PersistenceError::Decode {
                key: key.to_string(),
                source,
            };
            tracing::warn!(error = %err, "discarding unreadable upcoming reminders");
            return Vec::new();
        }
    };

    let mut upcoming: Vec<Reminder> = Vec::with_capacity(decoded.len());
    for item in decoded {
        if upcoming.iter().any(|existing| existing.id == item.id) {
            tracing::warn!(id = %item.id, "dropping duplicate persisted reminder");
            continue;
        }
        upcoming.push(item);
    }
    sort_by_when(&mut upcoming);
    upcoming
}
