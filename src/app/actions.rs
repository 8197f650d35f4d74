use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::triage::Priority;

/// Points at a reminder either by id or by its 1-based position in a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(String),
    Position(usize),
}

impl Target {
    fn parse(raw: &str) -> Result<Self> {
        match raw.strip_prefix('#') {
            Some(position) => {
                let position: usize = position
                    .parse()
                    .with_context(|| format!("invalid list position '{raw}'"))?;
                if position == 0 {
                    bail!("list positions start at #1");
                }
                Ok(Target::Position(position))
            }
            None => Ok(Target::Id(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditField {
    Text(String),
    When(OffsetDateTime),
    Priority(Option<Priority>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Accept(Target),
    Dismiss(Target),
    Remove(Target),
    Snooze { target: Target, minutes: i64 },
    Edit { target: Target, field: EditField },
    Undo,
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  refresh                      fetch new suggestions
  accept <id|#n>               move a suggestion to upcoming
  dismiss <id|#n>              drop a suggestion
  remove <id|#n>               delete an upcoming reminder
  snooze <id|#n> <minutes>     push an upcoming reminder later
  edit <id|#n> text <text>     change the reminder text
  edit <id|#n> at <rfc3339>    change the reminder time
  edit <id|#n> priority <p>    low, medium, high or none
  undo                         revert the last action
  list                         show both lists
  help                         show this message
  quit                         leave the shell
";

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let action = match verb.to_ascii_lowercase().as_str() {
            "refresh" | "r" => Action::Refresh,
            "accept" | "a" => Action::Accept(single_target(verb, rest)?),
            "dismiss" | "d" => Action::Dismiss(single_target(verb, rest)?),
            "remove" | "rm" => Action::Remove(single_target(verb, rest)?),
            "snooze" | "s" => {
                let mut parts = rest.split_whitespace();
                let target = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: snooze <id|#n> <minutes>"))?;
                let minutes = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: snooze <id|#n> <minutes>"))?;
                if parts.next().is_some() {
                    bail!("usage: snooze <id|#n> <minutes>");
                }
                Action::Snooze {
                    target: Target::parse(target)?,
                    minutes: minutes
                        .parse()
                        .with_context(|| format!("invalid minutes '{minutes}'"))?,
                }
            }
            "edit" | "e" => parse_edit(rest)?,
            "undo" | "u" => Action::Undo,
            "list" | "ls" => Action::List,
            "help" | "?" => Action::Help,
            "quit" | "q" | "exit" => Action::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command '{other}' (try 'help')"),
        };
        Ok(action)
    }
}

fn single_target(verb: &str, rest: &str) -> Result<Target> {
    let mut parts = rest.split_whitespace();
    let (Some(target), None) = (parts.next(), parts.next()) else {
        bail!("usage: {verb} <id|#n>");
    };
    Target::parse(target)
}

fn parse_edit(rest: &str) -> Result<Action> {
    const USAGE: &str = "usage: edit <id|#n> <text|at|priority> <value>";
    let mut parts = rest.splitn(3, char::is_whitespace);
    let target = parts.next().filter(|t| !t.is_empty()).ok_or_else(|| anyhow!(USAGE))?;
    let field = parts.next().ok_or_else(|| anyhow!(USAGE))?;
    let value = parts.next().map(str::trim).unwrap_or_default();
    if value.is_empty() {
        bail!(USAGE);
    }
    let field = match field.to_ascii_lowercase().as_str() {
        "text" => EditField::Text(value.to_string()),
        "at" | "when" => EditField::When(
            OffsetDateTime::parse(value, &Rfc3339)
                .with_context(|| format!("'{value}' is not an RFC 3339 timestamp"))?,
        ),
        "priority" => {
            if value.eq_ignore_ascii_case("none") {
                EditField::Priority(None)
            } else {
                EditField::Priority(Some(
                    Priority::from_str(value)
                        .map_err(|_| anyhow!("unknown priority '{value}'"))?,
                ))
            }
        }
        other => bail!("cannot edit field '{other}'"),
    };
    Ok(Action::Edit {
        target: Target::parse(target)?,
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    #[test]
    fn parses_targets_by_id_and_position() -> anyhow::Result<()> {
        assert_eq!(
            "accept demo-17".parse::<Action>()?,
            Action::Accept(Target::Id("demo-17".into()))
        );
        assert_eq!("d #2".parse::<Action>()?, Action::Dismiss(Target::Position(2)));
        assert!("accept #0".parse::<Action>().is_err());
        assert!("accept".parse::<Action>().is_err());
        assert!("accept a b".parse::<Action>().is_err());
        Ok(())
    }

    #[test]
    fn parses_snooze_minutes() -> anyhow::Result<()> {
        assert_eq!(
            "snooze #1 30".parse::<Action>()?,
            Action::Snooze {
                target: Target::Position(1),
                minutes: 30
            }
        );
        assert!("snooze #1 soon".parse::<Action>().is_err());
        assert!("snooze #1".parse::<Action>().is_err());
        Ok(())
    }

    #[test]
    fn edit_text_keeps_inner_whitespace() -> anyhow::Result<()> {
        let action = "edit u1 text Call   the dentist ".parse::<Action>()?;
        assert_matches!(
            action,
            Action::Edit { field: EditField::Text(ref text), .. } if text == "Call   the dentist"
        );
        Ok(())
    }

    #[test]
    fn edit_time_and_priority() -> anyhow::Result<()> {
        assert_eq!(
            "edit #1 at 2024-05-01T09:30:00Z".parse::<Action>()?,
            Action::Edit {
                target: Target::Position(1),
                field: EditField::When(datetime!(2024-05-01 09:30 UTC)),
            }
        );
        assert_eq!(
            "edit #1 priority none".parse::<Action>()?,
            Action::Edit {
                target: Target::Position(1),
                field: EditField::Priority(None),
            }
        );
        assert!("edit #1 at tomorrow".parse::<Action>().is_err());
        assert!("edit #1 colour red".parse::<Action>().is_err());
        Ok(())
    }

    #[test]
    fn unknown_and_empty_commands_fail() {
        assert!("".parse::<Action>().is_err());
        assert!("frobnicate".parse::<Action>().is_err());
        assert_eq!("Q".parse::<Action>().ok(), Some(Action::Quit));
    }
}
