//! Line command parser for the text driver.
//!
//! Every line reads `<session> <player> <command> [args...]`. A bare
//! `quit` ends the driver. Words that are not commands are passed through as
//! free text, which is how players answer order prompts and pick orders to
//! delete.

use thiserror::Error;

use crate::board::NameError;
use crate::game::{Action, NationPick};

/// Something to do with one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NewGame,
    Act(Action),
    /// Show the board.
    Board,
    /// Show the player's submitted orders.
    Orders,
    /// Repeat the player's current prompt.
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub session: String,
    pub player: String,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Request(Request),
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("expected '<session> <player> <command>'")]
    Incomplete,

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Nation(#[from] NameError),
}

/// Parses a single input line.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Line>, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.eq_ignore_ascii_case("quit") {
        return Ok(Some(Line::Quit));
    }

    let (session, rest) = trimmed
        .split_once(char::is_whitespace)
        .ok_or(CommandError::Incomplete)?;
    let (player, text) = rest
        .trim_start()
        .split_once(char::is_whitespace)
        .ok_or(CommandError::Incomplete)?;

    Ok(Some(Line::Request(Request {
        session: session.to_string(),
        player: player.to_string(),
        command: parse_command(text)?,
    })))
}

/// Parses the command part of a line.
pub fn parse_command(text: &str) -> Result<Command, CommandError> {
    let text = text.trim();
    let (word, rest) = match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());
    let required = |name| match rest {
        "" => Err(CommandError::MissingArgument(name)),
        _ => Ok(rest.to_string()),
    };

    let action = match word.to_ascii_lowercase().as_str() {
        "newgame" => return Ok(Command::NewGame),
        "board" => return Ok(Command::Board),
        "orders" => return Ok(Command::Orders),
        "prompt" => return Ok(Command::Prompt),

        "join" => Action::Join,
        "start" => Action::Start,
        "nation" => {
            let pick: NationPick = required("nation")?.parse()?;
            Action::ChooseNation(pick)
        }
        "year" => Action::Year(required("year")?),
        "new" | "order" => Action::NewOrder,
        "delete" => Action::Delete(arg),
        "ready" => Action::Ready,
        "unready" => Action::Unready,
        "retreat" => Action::Retreat(required("retreat")?),
        "disband" => Action::Disband(arg),
        "build" => Action::Build(required("build")?),
        "undo" => Action::Undo,
        "retry" => Action::Retry,
        "abort" => Action::Abort,
        "close" => Action::Close,
        _ => Action::Input(text.to_string()),
    };
    Ok(Command::Act(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Nation;

    fn act(text: &str) -> Action {
        match parse_command(text).unwrap() {
            Command::Act(action) => action,
            other => panic!("expected an action, got {other:?}"),
        }
    }

    #[test]
    fn parse_full_line() {
        let line = parse_line("  g1 alice   nation France ").unwrap();
        assert_eq!(
            line,
            Some(Line::Request(Request {
                session: "g1".into(),
                player: "alice".into(),
                command: Command::Act(Action::ChooseNation(NationPick::Nation(Nation::France))),
            }))
        );
    }

    #[test]
    fn parse_blank_and_quit() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line(" \t"), Ok(None));
        assert_eq!(parse_line("QUIT"), Ok(Some(Line::Quit)));
    }

    #[test]
    fn parse_incomplete_lines() {
        assert_eq!(parse_line("g1"), Err(CommandError::Incomplete));
        assert_eq!(parse_line("g1 alice"), Err(CommandError::Incomplete));
    }

    #[test]
    fn parse_queries() {
        assert_eq!(parse_command("NewGame"), Ok(Command::NewGame));
        assert_eq!(parse_command("board"), Ok(Command::Board));
        assert_eq!(parse_command("prompt"), Ok(Command::Prompt));
    }

    #[test]
    fn parse_arguments() {
        assert_eq!(act("year 44 BC"), Action::Year("44 BC".into()));
        assert_eq!(act("delete 1, 3-5"), Action::Delete(Some("1, 3-5".into())));
        assert_eq!(act("delete"), Action::Delete(None));
        assert_eq!(act("disband"), Action::Disband(None));
        assert_eq!(act("build StP f nc"), Action::Build("StP f nc".into()));
        assert_eq!(act("nation random"), Action::ChooseNation(NationPick::Random));
        assert_eq!(parse_command("retreat"), Err(CommandError::MissingArgument("retreat")));
        assert!(matches!(parse_command("nation Prussia"), Err(CommandError::Nation(_))));
    }

    #[test]
    fn other_text_is_free_input() {
        assert_eq!(act("Lon"), Action::Input("Lon".into()));
        assert_eq!(act("support move"), Action::Input("support move".into()));
        assert_eq!(act("1-2"), Action::Input("1-2".into()));
    }
}
