//! Maps parsed commands onto store operations

use crate::error::{LayerKvError, Result};
use crate::protocol::{parse_line, parse_raw_line, Command, Output};
use crate::store::Store;
use tracing::{debug, warn};

/// Result of handling one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank, unknown or malformed line; nothing was executed
    Ignored,
    /// A command ran; `output` is what it prints, if anything
    Executed {
        command: Command,
        output: Option<Output>,
    },
    /// `END` was read; processing stops
    End,
}

/// Command dispatcher owning one store instance
#[derive(Debug, Default)]
pub struct Dispatcher<S: Store> {
    store: S,
}

impl<S: Store> Dispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Parse and execute a single input line
    pub fn dispatch_line(&mut self, line: &str) -> Dispatch {
        self.dispatch_parsed(parse_line(line), line)
    }

    /// Like [`Dispatcher::dispatch_line`], for a line read as raw bytes
    pub fn dispatch_raw_line(&mut self, line: &[u8]) -> Dispatch {
        self.dispatch_parsed(parse_raw_line(line), &String::from_utf8_lossy(line))
    }

    fn dispatch_parsed(&mut self, parsed: Result<Option<Command>>, line: &str) -> Dispatch {
        match parsed {
            Ok(Some(Command::End)) => Dispatch::End,
            Ok(Some(command)) => {
                let output = self.execute(&command);
                Dispatch::Executed { command, output }
            }
            Ok(None) => Dispatch::Ignored,
            Err(LayerKvError::UnknownCommand(name)) => {
                debug!(command = %name, "ignoring unknown command");
                Dispatch::Ignored
            }
            Err(e) => {
                warn!(line = line.trim(), error = %e, "rejected command");
                Dispatch::Ignored
            }
        }
    }

    /// Execute a parsed command against the store
    pub fn execute(&mut self, command: &Command) -> Option<Output> {
        match command {
            Command::Set { key, value } => {
                if let Err(e) = self.store.set(key, value) {
                    warn!(error = %e, "SET failed");
                }
                None
            }
            Command::Get { key } => Some(match self.store.get(key) {
                Some(value) => Output::Value(value.to_string()),
                None => Output::Null,
            }),
            Command::Unset { key } => {
                self.store.delete(key);
                None
            }
            Command::NumEqualTo { value } => Some(Output::Count(self.store.count_equal_to(value))),
            Command::Begin => {
                self.store.begin();
                None
            }
            Command::Rollback => self.store.rollback().err().map(|_| Output::NoTransaction),
            Command::Commit => self.store.commit().err().map(|_| Output::NoTransaction),
            Command::End => None,
        }
    }
}
