use std::time::{Duration, Instant};

use strum::Display;
use time::OffsetDateTime;

use crate::triage::model::{Reminder, ReminderId};

pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_millis(8_000);

/// The most recent mutating action, carrying exactly what its inversion needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRecord {
    Accept {
        item: Reminder,
    },
    /// Only the id survives a dismissal; the content is gone.
    Dismiss {
        id: ReminderId,
    },
    Remove {
        item: Reminder,
    },
    Snooze {
        item: Reminder,
        previous_when: OffsetDateTime,
    },
    Edit {
        before: Reminder,
        after: Reminder,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Accept,
    Dismiss,
    Remove,
    Snooze,
    Edit,
}

impl ActionRecord {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRecord::Accept { .. } => ActionKind::Accept,
            ActionRecord::Dismiss { .. } => ActionKind::Dismiss,
            ActionRecord::Remove { .. } => ActionKind::Remove,
            ActionRecord::Snooze { .. } => ActionKind::Snooze,
            ActionRecord::Edit { .. } => ActionKind::Edit,
        }
    }

    pub fn reminder_id(&self) -> &ReminderId {
        match self {
            ActionRecord::Accept { item }
            | ActionRecord::Remove { item }
            | ActionRecord::Snooze { item, .. } => &item.id,
            ActionRecord::Dismiss { id } => id,
            ActionRecord::Edit { after, .. } => &after.id,
        }
    }
}

/// Deadline for one armed record. `None` means the window never closes.
#[derive(Debug, Clone, Copy)]
struct UndoTimer {
    deadline: Option<Instant>,
}

impl UndoTimer {
    fn start(now: Instant, window: Duration) -> Self {
        Self {
            deadline: now.checked_add(window),
        }
    }

    fn has_elapsed(&self, now: Instant) -> bool {
        self.deadline.map(|deadline| now >= deadline).unwrap_or(false)
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    Idle,
    Armed {
        kind: ActionKind,
        remaining: Duration,
    },
}

#[derive(Debug)]
struct Armed {
    record: ActionRecord,
    timer: UndoTimer,
}

/// Single-slot undo log. Arming replaces whatever was pending; every way out
/// of the armed state drops the timer with the record.
#[derive(Debug)]
pub struct UndoController {
    window: Duration,
    armed: Option<Armed>,
}

impl Default for UndoController {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_WINDOW)
    }
}

impl UndoController {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
        }
    }

    pub fn arm(&mut self, record: ActionRecord) -> Option<ActionRecord> {
        self.arm_at(record, Instant::now())
    }

    /// Arms `record`, returning the record it superseded, if any.
    pub fn arm_at(&mut self, record: ActionRecord, now: Instant) -> Option<ActionRecord> {
        tracing::debug!(kind = %record.kind(), id = %record.reminder_id(), "arming undo");
        let previous = self.armed.replace(Armed {
            record,
            timer: UndoTimer::start(now, self.window),
        });
        previous.map(|armed| armed.record)
    }

    /// Returns the live record for inversion and disarms. Yields `None` when
    /// idle or when the window already closed.
    pub fn take_at(&mut self, now: Instant) -> Option<ActionRecord> {
        let armed = self.armed.take()?;
        if armed.timer.has_elapsed(now) {
            tracing::debug!(kind = %armed.record.kind(), "undo window closed before undo");
            return None;
        }
        Some(armed.record)
    }

    /// Disarms when the timer has run out; returns the expired record.
    pub fn expire_at(&mut self, now: Instant) -> Option<ActionRecord> {
        let elapsed = self
            .armed
            .as_ref()
            .map(|armed| armed.timer.has_elapsed(now))
            .unwrap_or(false);
        if !elapsed {
            return None;
        }
        let expired = self.armed.take().map(|armed| armed.record);
        if let Some(record) = &expired {
            tracing::debug!(kind = %record.kind(), "undo window expired");
        }
        expired
    }

    /// Idempotent.
    pub fn disarm(&mut self) -> Option<ActionRecord> {
        self.armed.take().map(|armed| armed.record)
    }

    pub fn pending_at(&self, now: Instant) -> Option<&ActionRecord> {
        self.armed
            .as_ref()
            .filter(|armed| !armed.timer.has_elapsed(now))
            .map(|armed| &armed.record)
    }

    pub fn pending(&self) -> Option<&ActionRecord> {
        self.pending_at(Instant::now())
    }

    pub fn state_at(&self, now: Instant) -> UndoState {
        match &self.armed {
            Some(armed) if !armed.timer.has_elapsed(now) => UndoState::Armed {
                kind: armed.record.kind(),
                remaining: armed.timer.remaining(now),
            },
            _ => UndoState::Idle,
        }
    }

    pub fn state(&self) -> UndoState {
        self.state_at(Instant::now())
    }
}
