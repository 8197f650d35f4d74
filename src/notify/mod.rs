use std::str::FromStr;

use anyhow::{Context, Result};
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{NotificationConfig, PERMISSION_KEY};
use crate::error::NotificationError;
use crate::storage::{NotificationRecord, StorageHandle};
use crate::triage::{NotificationId, Reminder};

/// Schedules and cancels local notifications for reminders.
pub trait NotificationScheduler {
    fn schedule(&self, reminder: &Reminder) -> Result<NotificationId, NotificationError>;
    fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationPermission {
    Granted,
    Denied,
}

/// Returns the stored permission, asking through `prompt` only when nothing
/// has been decided yet. The answer is persisted so the question comes up once.
pub fn resolve_permission<F>(
    storage: &StorageHandle,
    config: &NotificationConfig,
    prompt: F,
) -> Result<NotificationPermission>
where
    F: FnOnce() -> Result<bool>,
{
    if let Some(raw) = storage.read_value(PERMISSION_KEY)? {
        match NotificationPermission::from_str(&raw) {
            Ok(permission) => return Ok(permission),
            Err(_) => tracing::warn!(%raw, "unrecognised stored notification permission"),
        }
    }
    if !config.ask_permission {
        return Ok(NotificationPermission::Granted);
    }
    let permission = if prompt().context("asking for notification permission")? {
        NotificationPermission::Granted
    } else {
        NotificationPermission::Denied
    };
    storage
        .write_value(PERMISSION_KEY, &permission.to_string())
        .context("persisting notification permission")?;
    tracing::info!(%permission, "notification permission decided");
    Ok(permission)
}

/// Scheduler that keeps pending notifications in the local database.
#[derive(Clone)]
pub struct LocalScheduler {
    storage: StorageHandle,
    permission: NotificationPermission,
    enabled: bool,
}

impl LocalScheduler {
    pub fn new(
        storage: StorageHandle,
        config: &NotificationConfig,
        permission: NotificationPermission,
    ) -> Self {
        Self {
            storage,
            permission,
            enabled: config.enabled,
        }
    }

    pub fn pending(&self) -> Result<Vec<NotificationRecord>> {
        self.storage.list_notifications()
    }
}

impl NotificationScheduler for LocalScheduler {
    fn schedule(&self, reminder: &Reminder) -> Result<NotificationId, NotificationError> {
        if !self.enabled {
            return Err(NotificationError::Disabled);
        }
        if self.permission == NotificationPermission::Denied {
            return Err(NotificationError::PermissionDenied);
        }
        let id = Uuid::new_v4().to_string();
        let record = NotificationRecord {
            id: id.clone(),
            reminder_id: reminder.id.to_string(),
            body: reminder.text.clone(),
            fire_at: reminder.when.unix_timestamp(),
            created_at: OffsetDateTime::now_utc().unix_timestamp(),
        };
        self.storage
            .insert_notification(&record)
            .map_err(|err| NotificationError::Backend(format!("{err:#}")))?;
        tracing::debug!(notification = %id, reminder = %reminder.id, "notification scheduled");
        Ok(NotificationId::new(id))
    }

    fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError> {
        let removed = self
            .storage
            .delete_notification(id.as_str())
            .map_err(|err| NotificationError::Backend(format!("{err:#}")))?;
        if !removed {
            tracing::debug!(notification = %id, "cancel for unknown notification");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::init_storage;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    fn reminder() -> Reminder {
        Reminder::new("s1", "Charge laptop", datetime!(2030-01-01 08:00 UTC))
    }

    #[test]
    fn schedule_and_cancel_round_through_the_database() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let scheduler = LocalScheduler::new(
            storage,
            &NotificationConfig::default(),
            NotificationPermission::Granted,
        );

        let id = scheduler.schedule(&reminder())?;
        let pending = scheduler.pending()?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id.as_str());
        assert_eq!(pending[0].reminder_id, "s1");
        assert_eq!(
            pending[0].fire_at,
            datetime!(2030-01-01 08:00 UTC).unix_timestamp()
        );

        scheduler.cancel(&id)?;
        assert!(scheduler.pending()?.is_empty());
        scheduler.cancel(&id)?;
        Ok(())
    }

    #[test]
    fn denied_permission_refuses_to_schedule() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let scheduler = LocalScheduler::new(
            storage,
            &NotificationConfig::default(),
            NotificationPermission::Denied,
        );
        assert_matches!(
            scheduler.schedule(&reminder()),
            Err(NotificationError::PermissionDenied)
        );
        assert!(scheduler.pending()?.is_empty());
        Ok(())
    }

    #[test]
    fn disabled_config_refuses_to_schedule() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let config = NotificationConfig {
            enabled: false,
            ask_permission: true,
        };
        let scheduler = LocalScheduler::new(storage, &config, NotificationPermission::Granted);
        assert_matches!(
            scheduler.schedule(&reminder()),
            Err(NotificationError::Disabled)
        );
        Ok(())
    }

    #[test]
    fn permission_is_asked_once_and_remembered() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let config = NotificationConfig::default();

        let first = resolve_permission(&storage, &config, || Ok(false))?;
        assert_eq!(first, NotificationPermission::Denied);

        let second = resolve_permission(&storage, &config, || {
            anyhow::bail!("prompt should not run twice")
        })?;
        assert_eq!(second, NotificationPermission::Denied);
        Ok(())
    }

    #[test]
    fn skipping_the_prompt_grants_without_persisting() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let config = NotificationConfig {
            enabled: true,
            ask_permission: false,
        };
        let permission = resolve_permission(&storage, &config, || Ok(false))?;
        assert_eq!(permission, NotificationPermission::Granted);
        assert_eq!(storage.read_value(PERMISSION_KEY)?, None);
        Ok(())
    }
}
