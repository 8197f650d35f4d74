use std::thread;
use std::time::Duration;

use time::OffsetDateTime;

use crate::error::SourceError;
use crate::triage::{Priority, Reminder};

/// Produces reminder suggestions for the triage screen.
pub trait SuggestionSource {
    fn fetch_suggestions(&self) -> Result<Vec<Reminder>, SourceError>;
}

/// Stand-in source: waits out a fixed latency, then returns three canned
/// suggestions timed relative to now.
#[derive(Debug, Clone)]
pub struct DemoSuggestionSource {
    latency: Duration,
}

impl DemoSuggestionSource {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn suggestions_at(now: OffsetDateTime) -> Vec<Reminder> {
        let base_ms = now.unix_timestamp_nanos() / 1_000_000;
        let canned = [
            (
                "Prepare slides for tomorrow's meeting",
                time::Duration::hours(24),
                Priority::High,
            ),
            (
                "Charge laptop + pack charger",
                time::Duration::hours(2),
                Priority::Medium,
            ),
            (
                "Send agenda to attendees",
                time::Duration::hours(6),
                Priority::Low,
            ),
        ];
        canned
            .into_iter()
            .enumerate()
            .map(|(offset, (text, lead, priority))| {
                let id = format!("demo-{}", base_ms + offset as i128 + 1);
                Reminder::new(id, text, now + lead).with_priority(priority)
            })
            .collect()
    }
}

impl Default for DemoSuggestionSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(650))
    }
}

impl SuggestionSource for DemoSuggestionSource {
    fn fetch_suggestions(&self) -> Result<Vec<Reminder>, SourceError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        Ok(Self::suggestions_at(OffsetDateTime::now_utc()))
    }
}
