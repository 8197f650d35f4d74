use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::app::{format_when, Action, Flow, Session};
use crate::config::{AppConfig, NotificationConfig};
use crate::notify::{resolve_permission, LocalScheduler, NotificationPermission};
use crate::storage::{NotificationRecord, StorageHandle};
use crate::suggest::{DemoSuggestionSource, SuggestionSource};
use crate::triage::{Collaborators, Reminder, ReminderStore, StoreOptions};

pub fn run_shell(config: &AppConfig, storage: StorageHandle) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let permission = if interactive {
        resolve_permission(&storage, &config.notifications, ask_permission)?
    } else {
        stored_permission(&storage, &config.notifications)?
    };
    let store = mount_store(config, &storage, permission);
    let mut session = Session::new(store, permission);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    drive_shell(&mut session, stdin.lock(), &mut stdout)
}

/// Reads commands line by line until `quit` or end of input.
pub fn drive_shell<R, W>(session: &mut Session, input: R, out: &mut W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    write!(out, "{}", format_lists(session.store())).context("writing to terminal")?;
    let mut lines = input.lines();
    loop {
        if let Some(message) = session.take_status_message() {
            writeln!(out, "{message}")?;
        }
        if let Some(hint) = session.undo_hint() {
            writeln!(out, "  {hint}")?;
        }
        write!(out, "remindtri> ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line.context("reading command")?;
        if line.trim().is_empty() {
            session.on_tick();
            continue;
        }
        let action: Action = match line.parse() {
            Ok(action) => action,
            Err(err) => {
                writeln!(out, "{err:#}")?;
                continue;
            }
        };
        let show_lists = matches!(action, Action::List | Action::Refresh);
        if session.handle(action) == Flow::Quit {
            break;
        }
        if show_lists {
            write!(out, "{}", format_lists(session.store()))?;
        }
    }
    Ok(())
}

pub fn list_upcoming(config: &AppConfig, storage: StorageHandle) -> Result<()> {
    let permission = stored_permission(&storage, &config.notifications)?;
    let store = mount_store(config, &storage, permission);
    print!("{}", format_section("Upcoming", store.upcoming(), "No upcoming reminders"));
    Ok(())
}

pub fn print_suggestions(config: &AppConfig) -> Result<()> {
    let source = DemoSuggestionSource::new(config.suggestions.latency());
    let suggestions = source
        .fetch_suggestions()
        .context("fetching suggestions")?;
    print!(
        "{}",
        format_section("Suggestions", &suggestions, "No suggestions yet")
    );
    Ok(())
}

pub fn list_pending(config: &AppConfig, storage: StorageHandle) -> Result<()> {
    let permission = stored_permission(&storage, &config.notifications)?;
    let scheduler = LocalScheduler::new(storage, &config.notifications, permission);
    let pending = scheduler
        .pending()
        .context("listing scheduled notifications")?;
    print!("{}", format_pending(&pending));
    Ok(())
}

fn mount_store(
    config: &AppConfig,
    storage: &StorageHandle,
    permission: NotificationPermission,
) -> ReminderStore {
    let services = Collaborators {
        storage: Arc::new(storage.clone()),
        scheduler: Arc::new(LocalScheduler::new(
            storage.clone(),
            &config.notifications,
            permission,
        )),
        source: Arc::new(DemoSuggestionSource::new(config.suggestions.latency())),
    };
    ReminderStore::mount(services, StoreOptions::from_config(config))
}

/// Permission without prompting: the stored answer, or granted when none exists.
fn stored_permission(
    storage: &StorageHandle,
    config: &NotificationConfig,
) -> Result<NotificationPermission> {
    let silent = NotificationConfig {
        ask_permission: false,
        ..config.clone()
    };
    resolve_permission(storage, &silent, || Ok(true))
}

fn ask_permission() -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "Allow reminder notifications? [y/N]: ")?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub fn format_lists(store: &ReminderStore) -> String {
    let mut out = format_section("Upcoming", store.upcoming(), "No upcoming reminders");
    out.push_str(&format_section(
        "Suggestions",
        store.suggestions(),
        "No suggestions yet",
    ));
    out
}

fn format_section(title: &str, items: &[Reminder], empty: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{title}");
    if items.is_empty() {
        let _ = writeln!(&mut out, "  • {empty}");
        return out;
    }
    for (index, item) in items.iter().enumerate() {
        let mut line = format!("  #{}  {}  {}", index + 1, item.text, format_when(item));
        if let Some(priority) = item.priority {
            let _ = write!(&mut line, "  [{priority}]");
        }
        if item.notification_id.is_some() {
            line.push_str("  (alert set)");
        }
        let _ = writeln!(&mut out, "{line}");
        let _ = writeln!(&mut out, "      id {}", item.id);
    }
    out
}

fn format_pending(pending: &[NotificationRecord]) -> String {
    if pending.is_empty() {
        return "No notifications scheduled.\n".to_string();
    }
    let mut out = String::new();
    for record in pending {
        let _ = writeln!(
            &mut out,
            "{}  {}  {}",
            format_timestamp(record.fire_at),
            record.body,
            record.reminder_id
        );
    }
    out
}

fn format_timestamp(epoch: i64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch)
        .map(|dt| dt.format(&Rfc3339).unwrap_or_else(|_| epoch.to_string()))
        .unwrap_or_else(|_| epoch.to_string())
}
