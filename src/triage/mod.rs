mod model;
mod store;
mod undo;

#[cfg(test)]
pub(crate) mod testing;

pub use model::{sort_by_when, NotificationId, Priority, Reminder, ReminderId};
pub use store::{Collaborators, ReminderStore, StoreOptions};
pub use undo::{ActionKind, ActionRecord, UndoController, UndoState, DEFAULT_UNDO_WINDOW};
