use time::format_description::well_known::Rfc3339;

use crate::error::TriageError;
use crate::notify::NotificationPermission;
use crate::triage::{Reminder, ReminderId, ReminderStore, UndoState};

mod actions;

pub use actions::{Action, EditField, Target, HELP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Suggestions,
    Upcoming,
}

/// One triage screen: owns the store for its lifetime and turns every
/// outcome into a status line for the user.
pub struct Session {
    store: ReminderStore,
    status: Option<String>,
}

impl Session {
    pub fn new(store: ReminderStore, permission: NotificationPermission) -> Self {
        let mut session = Self {
            store,
            status: None,
        };
        if permission == NotificationPermission::Denied {
            session.set_status_message(Some(
                "Notifications are off; accepted reminders will not alert you.",
            ));
        }
        session
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn take_status_message(&mut self) -> Option<String> {
        self.status.take()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status = message.map(Into::into);
    }

    pub fn undo_hint(&self) -> Option<String> {
        match self.store.undo_state() {
            UndoState::Idle => None,
            UndoState::Armed { kind, remaining } => Some(format!(
                "'undo' reverts {kind} ({}s left)",
                remaining.as_secs()
            )),
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(kind) = self.store.expire_undo() {
            tracing::debug!(%kind, "undo no longer available");
        }
    }

    pub fn handle(&mut self, action: Action) -> Flow {
        self.on_tick();
        match action {
            Action::Quit => return Flow::Quit,
            Action::Help => self.set_status_message(Some(HELP)),
            Action::List => self.set_status_message(None::<String>),
            Action::Refresh => self.handle_refresh(),
            Action::Accept(target) => self.handle_accept(target),
            Action::Dismiss(target) => self.handle_dismiss(target),
            Action::Remove(target) => self.handle_remove(target),
            Action::Snooze { target, minutes } => self.handle_snooze(target, minutes),
            Action::Edit { target, field } => self.handle_edit(target, field),
            Action::Undo => self.handle_undo(),
        }
        Flow::Continue
    }

    fn handle_refresh(&mut self) {
        match self.store.load_suggestions() {
            Ok(0) => self.set_status_message(Some("No new suggestions")),
            Ok(count) => self.set_status_message(Some(format!("Loaded {count} suggestion(s)"))),
            Err(TriageError::Source(_)) => {
                self.set_status_message(Some("Failed to load suggestions"))
            }
            Err(err) => self.report(err),
        }
    }

    fn handle_accept(&mut self, target: Target) {
        let Some(id) = self.resolve(&target, ListKind::Suggestions) else {
            return;
        };
        match self.store.accept(&id) {
            Ok(item) => {
                let mut message = format!("Added to Upcoming: {}", item.text);
                if item.notification_id.is_none() {
                    message.push_str(" (no notification scheduled)");
                }
                self.set_status_message(Some(message));
            }
            Err(err) => self.report(err),
        }
    }

    fn handle_dismiss(&mut self, target: Target) {
        let Some(id) = self.resolve(&target, ListKind::Suggestions) else {
            return;
        };
        match self.store.dismiss(&id) {
            Ok(()) => self.set_status_message(Some("Suggestion dismissed")),
            Err(err) => self.report(err),
        }
    }

    fn handle_remove(&mut self, target: Target) {
        let Some(id) = self.resolve(&target, ListKind::Upcoming) else {
            return;
        };
        match self.store.remove_upcoming(&id) {
            Ok(item) => self.set_status_message(Some(format!("Removed: {}", item.text))),
            Err(err) => self.report(err),
        }
    }

    fn handle_snooze(&mut self, target: Target, minutes: i64) {
        let Some(id) = self.resolve(&target, ListKind::Upcoming) else {
            return;
        };
        match self.store.snooze(&id, minutes) {
            Ok(item) => self.set_status_message(Some(format!(
                "Snoozed {} until {}",
                item.text,
                format_when(&item)
            ))),
            Err(err) => self.report(err),
        }
    }

    fn handle_edit(&mut self, target: Target, field: EditField) {
        let Some(id) = self.resolve(&target, ListKind::Upcoming) else {
            return;
        };
        let Some(mut after) = self
            .store
            .upcoming()
            .iter()
            .find(|item| item.id == id)
            .cloned()
        else {
            self.report(TriageError::UnknownUpcoming(id));
            return;
        };
        match field {
            EditField::Text(text) => after.text = text,
            EditField::When(when) => after.when = when,
            EditField::Priority(priority) => after.priority = priority,
        }
        match self.store.edit(after) {
            Ok(item) => self.set_status_message(Some(format!("Updated: {}", item.text))),
            Err(err) => self.report(err),
        }
    }

    fn handle_undo(&mut self) {
        match self.store.undo() {
            Ok(Some(kind)) => self.set_status_message(Some(format!("Undid {kind}"))),
            Ok(None) => self.set_status_message(Some("Nothing to undo")),
            Err(TriageError::UnsupportedUndo { .. }) => self.set_status_message(Some(
                "Undo is not supported for dismissed suggestions; the content cannot be restored.",
            )),
            Err(err) => self.report(err),
        }
    }

    fn resolve(&mut self, target: &Target, list: ListKind) -> Option<ReminderId> {
        match target {
            Target::Id(raw) => Some(ReminderId::new(raw.as_str())),
            Target::Position(position) => {
                let items = match list {
                    ListKind::Suggestions => self.store.suggestions(),
                    ListKind::Upcoming => self.store.upcoming(),
                };
                match position.checked_sub(1).and_then(|index| items.get(index)) {
                    Some(item) => Some(item.id.clone()),
                    None => {
                        let label = match list {
                            ListKind::Suggestions => "suggestion",
                            ListKind::Upcoming => "upcoming reminder",
                        };
                        self.set_status_message(Some(format!("No {label} at #{position}")));
                        None
                    }
                }
            }
        }
    }

    fn report(&mut self, err: TriageError) {
        tracing::debug!(error = %err, "action rejected");
        self.set_status_message(Some(err.to_string()));
    }
}

pub fn format_when(item: &Reminder) -> String {
    item.when
        .format(&Rfc3339)
        .unwrap_or_else(|_| item.when.unix_timestamp().to_string())
}
