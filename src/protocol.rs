//! The newline-delimited text protocol.
//!
//! Requests are `SET <key> <value...>`, `GET <key>` and `DEL <key>`, one
//! per line. Every non-blank request line gets exactly one response line.
//! A value can never contain a newline, since the newline would end the
//! request.

use std::fmt;

use thiserror::Error;

/// A request decoded from one protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SET <key> <value...>`
    Set {
        /// The key to set.
        key: String,
        /// The value, verbatim, possibly containing whitespace.
        value: String,
    },
    /// `GET <key>`
    Get {
        /// The key to look up.
        key: String,
    },
    /// `DEL <key>`
    Delete {
        /// The key to remove.
        key: String,
    },
    /// A line whose keyword is not recognized, kept as received.
    Unknown(String),
    /// A recognized keyword with missing arguments.
    Malformed(MalformedCommand),
}

/// Why a recognized command could not be decoded.
///
/// The `Display` text is sent to the client after `ERROR: `.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedCommand {
    /// `SET` without a key or without a value.
    #[error("SET requires key and value")]
    SetRequiresKeyAndValue,
    /// `GET` without a key.
    #[error("GET requires key")]
    GetRequiresKey,
    /// `DEL` without a key.
    #[error("DEL requires key")]
    DelRequiresKey,
}

/// A response line, rendered by `Display` without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK`
    Ok,
    /// The value stored under the requested key.
    Value(String),
    /// `NOT_FOUND`
    NotFound,
    /// `DELETED`
    Deleted,
    /// `ERROR: <message>`
    Error(String),
}

impl Response {
    /// The response to a line with an unrecognized keyword.
    pub fn unknown_command() -> Self {
        Response::Error("Unknown command".to_owned())
    }
}

impl From<MalformedCommand> for Response {
    fn from(reason: MalformedCommand) -> Self {
        Response::Error(reason.to_string())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("OK"),
            Response::Value(value) => f.write_str(value),
            Response::NotFound => f.write_str("NOT_FOUND"),
            Response::Deleted => f.write_str("DELETED"),
            Response::Error(message) => write!(f, "ERROR: {message}"),
        }
    }
}

/// Decodes one line, terminator already stripped, into a command.
///
/// Keywords are matched case-sensitively. For `SET` only the key is split
/// off by whitespace; the rest of the line, minus at most one leading
/// space, is the value.
pub fn parse(line: &str) -> Command {
    let Some((keyword, args)) = next_token(line) else {
        return Command::Unknown(line.to_owned());
    };

    match keyword {
        "SET" => match next_token(args) {
            Some((key, rest)) => {
                let value = rest.strip_prefix(' ').unwrap_or(rest);
                if value.is_empty() {
                    Command::Malformed(MalformedCommand::SetRequiresKeyAndValue)
                } else {
                    Command::Set {
                        key: key.to_owned(),
                        value: value.to_owned(),
                    }
                }
            }
            None => Command::Malformed(MalformedCommand::SetRequiresKeyAndValue),
        },
        "GET" => match next_token(args) {
            Some((key, _)) => Command::Get {
                key: key.to_owned(),
            },
            None => Command::Malformed(MalformedCommand::GetRequiresKey),
        },
        "DEL" => match next_token(args) {
            Some((key, _)) => Command::Delete {
                key: key.to_owned(),
            },
            None => Command::Malformed(MalformedCommand::DelRequiresKey),
        },
        _ => Command::Unknown(line.to_owned()),
    }
}

/// Splits off the next whitespace-delimited token, returning it and
/// everything after it (starting at the separating whitespace).
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
    if s.is_empty() {
        return None;
    }
    let end = s.find(|c: char| c.is_ascii_whitespace()).unwrap_or(s.len());
    Some(s.split_at(end))
}
