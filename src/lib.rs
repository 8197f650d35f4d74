pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod suggest;
pub mod triage;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{NotificationError, PersistenceError, SourceError, TriageError};
pub use triage::{Reminder, ReminderStore};
