use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Opaque identifier assigned by the suggestion source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(String);

impl ReminderId {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReminderId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ReminderId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Handle returned by a notification scheduler for one pending notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub when: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Present only on upcoming items whose notification was scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<NotificationId>,
}

impl Reminder {
    pub fn new<I, S>(id: I, text: S, when: OffsetDateTime) -> Self
    where
        I: Into<ReminderId>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            text: text.into(),
            when,
            priority: None,
            notification_id: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Same reminder content with the notification handle stripped.
    pub fn detached(&self) -> Self {
        Self {
            notification_id: None,
            ..self.clone()
        }
    }
}

/// Stable ascending sort by `when`; items sharing a time keep their order.
pub fn sort_by_when(items: &mut [Reminder]) {
    items.sort_by(|a, b| a.when.cmp(&b.when));
}

#[cfg(test)]
pub(crate) fn is_sorted_by_when(items: &[Reminder]) -> bool {
    items.windows(2).all(|pair| pair[0].when <= pair[1].when)
}
