//! Statement parser and command definitions for nestkv
//!
//! A statement is one line: a command name followed by whitespace-separated
//! arguments. Tokenizing is done with nom; arity is checked against a fixed
//! command table before anything reaches the store.

use crate::error::{NestKvError, Result};
use nom::{
    bytes::complete::{take_while, take_while1},
    combinator::all_consuming,
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};

/// Commands supported by the nestkv protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Count { value: String },
    Begin,
    Rollback,
    Commit,
    End,
}

/// Command names and the number of arguments each takes
const COMMAND_TABLE: &[(&str, usize)] = &[
    ("SET", 2),
    ("GET", 1),
    ("DELETE", 1),
    ("COUNT", 1),
    ("BEGIN", 0),
    ("ROLLBACK", 0),
    ("COMMIT", 0),
    ("END", 0),
];

/// Response to a single statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Value(String),
    Null,
    Count(i64),
    Error(String),
}

/// How responses are written back to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Bare payloads, nothing for statements without one
    Console,
    /// One tagged CRLF-terminated line per statement
    Wire,
}

impl Response {
    /// Serialize response to bytes for network transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::Ok => b"OK\r\n".to_vec(),
            Response::Value(v) => format!("VALUE {}\r\n", v).into_bytes(),
            Response::Null => b"NULL\r\n".to_vec(),
            Response::Count(n) => format!("COUNT {}\r\n", n).into_bytes(),
            Response::Error(e) => format!("ERROR {}\r\n", e).into_bytes(),
        }
    }

    /// Text printed on the console, if any
    pub fn render(&self) -> Option<String> {
        match self {
            Response::Ok => None,
            Response::Value(v) => Some(v.clone()),
            Response::Null => Some("NULL".to_string()),
            Response::Count(n) => Some(n.to_string()),
            Response::Error(e) => Some(e.clone()),
        }
    }

    /// Bytes to send for the given output mode
    pub fn encode(&self, mode: OutputMode) -> Vec<u8> {
        match mode {
            OutputMode::Wire => self.to_bytes(),
            OutputMode::Console => match self.render() {
                Some(text) => format!("{}\n", text).into_bytes(),
                None => Vec::new(),
            },
        }
    }

    /// Parse a wire line produced by [`Response::to_bytes`]
    pub fn parse_wire(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == "OK" {
            Ok(Response::Ok)
        } else if line == "NULL" {
            Ok(Response::Null)
        } else if let Some(value) = line.strip_prefix("VALUE ") {
            Ok(Response::Value(value.to_string()))
        } else if let Some(count) = line.strip_prefix("COUNT ") {
            count
                .parse()
                .map(Response::Count)
                .map_err(|_| NestKvError::Protocol(format!("Invalid count: {}", count)))
        } else if let Some(error) = line.strip_prefix("ERROR ") {
            Ok(Response::Error(error.to_string()))
        } else {
            Err(NestKvError::Protocol(format!(
                "Unknown response format: {}",
                line
            )))
        }
    }
}

impl Command {
    /// Render the command as a protocol statement (without line terminator)
    pub fn to_statement(&self) -> String {
        match self {
            Command::Set { key, value } => format!("SET {} {}", key, value),
            Command::Get { key } => format!("GET {}", key),
            Command::Delete { key } => format!("DELETE {}", key),
            Command::Count { value } => format!("COUNT {}", value),
            Command::Begin => "BEGIN".to_string(),
            Command::Rollback => "ROLLBACK".to_string(),
            Command::Commit => "COMMIT".to_string(),
            Command::End => "END".to_string(),
        }
    }

    /// Build a command from its name and arguments, checking arity
    fn from_tokens(name: &str, args: Vec<&str>) -> Result<Self> {
        let name = name.to_uppercase();
        let expected = COMMAND_TABLE
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, arity)| *arity)
            .ok_or_else(|| NestKvError::InvalidCommand(name.clone()))?;

        if args.len() != expected {
            return Err(NestKvError::InvalidArgumentCount {
                command: name,
                expected,
                found: args.len(),
            });
        }

        let mut args = args.into_iter().map(str::to_string);
        let mut next = || args.next().unwrap_or_default();
        let command = match name.as_str() {
            "SET" => Command::Set {
                key: next(),
                value: next(),
            },
            "GET" => Command::Get { key: next() },
            "DELETE" => Command::Delete { key: next() },
            "COUNT" => Command::Count { value: next() },
            "BEGIN" => Command::Begin,
            "ROLLBACK" => Command::Rollback,
            "COMMIT" => Command::Commit,
            "END" => Command::End,
            other => return Err(NestKvError::InvalidCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// Parse one statement line into a command
pub fn parse_statement(input: &str) -> Result<Command> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(NestKvError::EmptyStatement);
    }

    let (_, (name, args)) = statement_parser(trimmed)?;
    Command::from_tokens(name, args)
}

/// Main statement parser using nom combinators
fn statement_parser(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    all_consuming(delimited(
        take_while(char::is_whitespace),
        pair(token, many0(preceded(separator, token))),
        take_while(char::is_whitespace),
    ))(input)
}

/// Any run of whitespace, the complement of [`token`]
fn separator(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace)(input)
}

/// A run of non-whitespace characters
fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}
