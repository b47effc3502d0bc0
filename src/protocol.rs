//! Protocol parser and command definitions for layerkv
//!
//! A request is one line of whitespace-delimited tokens,
//! `COMMAND [ARG1] [ARG2]`. Tokenizing is done with nom; mapping the tokens
//! onto a [`Command`] is plain matching.

use crate::error::{LayerKvError, Result};
use nom::{
    bytes::complete::take_while1,
    character::complete::{multispace0, multispace1},
    combinator::all_consuming,
    multi::separated_list0,
    sequence::delimited,
    IResult,
};
use serde::Serialize;
use std::fmt;

/// Commands understood by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Set { key: String, value: String },
    Get { key: String },
    Unset { key: String },
    #[serde(rename = "NUMEQUALTO")]
    NumEqualTo { value: String },
    Begin,
    Rollback,
    Commit,
    End,
}

impl Command {
    /// Protocol name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Unset { .. } => "UNSET",
            Command::NumEqualTo { .. } => "NUMEQUALTO",
            Command::Begin => "BEGIN",
            Command::Rollback => "ROLLBACK",
            Command::Commit => "COMMIT",
            Command::End => "END",
        }
    }

    /// Build a command from a name and its arguments. Surplus arguments are ignored.
    pub fn from_tokens(name: &str, args: &[&str]) -> Result<Self> {
        let arg = |index: usize, what: &str| -> Result<String> {
            args.get(index)
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    LayerKvError::InvalidArgument(format!("{} requires a {}", name, what))
                })
        };

        let command = match name {
            "SET" => Command::Set {
                key: arg(0, "key")?,
                value: arg(1, "value")?,
            },
            "GET" => Command::Get { key: arg(0, "key")? },
            "UNSET" => Command::Unset { key: arg(0, "key")? },
            "NUMEQUALTO" => Command::NumEqualTo {
                value: arg(0, "value")?,
            },
            "BEGIN" => Command::Begin,
            "ROLLBACK" => Command::Rollback,
            "COMMIT" => Command::Commit,
            "END" => Command::End,
            other => return Err(LayerKvError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// What a command prints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Output {
    Value(String),
    Null,
    Count(usize),
    NoTransaction,
}

impl Output {
    /// Serialize output as a single text line
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}\n", self).into_bytes()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Value(v) => write!(f, "{}", v),
            Output::Null => write!(f, "NULL"),
            Output::Count(n) => write!(f, "{}", n),
            Output::NoTransaction => write!(f, "NO TRANSACTION"),
        }
    }
}

/// One executed command and its output, as written in JSON mode
#[derive(Debug, Serialize)]
pub struct Reply<'a> {
    #[serde(flatten)]
    pub command: &'a Command,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a Output>,
}

impl Reply<'_> {
    /// Serialize reply as one JSON line
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Split a line into whitespace-delimited tokens
pub fn tokenize(line: &str) -> Result<Vec<&str>> {
    let (_, tokens) = tokens_parser(line)?;
    Ok(tokens)
}

/// Parse one raw input line, rejecting bytes that are not UTF-8
pub fn parse_raw_line(line: &[u8]) -> Result<Option<Command>> {
    let line = std::str::from_utf8(line).map_err(|e| {
        LayerKvError::Protocol(format!("line is not valid UTF-8: {}", e))
    })?;
    parse_line(line)
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let tokens = tokenize(line)?;
    match tokens.split_first() {
        Some((name, args)) => Command::from_tokens(name, args).map(Some),
        None => Ok(None),
    }
}

fn tokens_parser(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(delimited(
        multispace0,
        separated_list0(multispace1, token),
        multispace0,
    ))(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}
