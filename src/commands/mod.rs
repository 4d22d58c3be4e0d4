pub mod del;
pub mod executable;
pub mod exists;
pub mod get;
pub mod incr;
pub mod incrby;
pub mod keys;
pub mod ping;
pub mod router;
pub mod set;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::frame::Frame;

pub use executable::{CommandHandler, Executable, Handler};
pub use router::Router;

/// Pulls typed arguments out of a command's argument list.
///
/// Running out of arguments and leftover arguments are both reported as errors naming the
/// command, which is why the parser carries the command name.
pub struct CommandParser {
    command: &'static str,
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    pub fn new(command: &'static str, args: Vec<Frame>) -> CommandParser {
        CommandParser {
            command,
            parts: args.into_iter(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.parts.len() > 0
    }

    /// Next argument as a UTF-8 string, used for keys and patterns.
    pub fn next_string(&mut self) -> Result<String, CommandParserError> {
        let bytes = self.next_bytes()?;

        str::from_utf8(&bytes[..])
            .map(|s| s.to_string())
            .map_err(CommandParserError::InvalidUTF8String)
    }

    /// Next argument as a base-10 signed 64-bit integer.
    pub fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        let bytes = self.next_bytes()?;

        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandParserError::NotAnInteger)
    }

    /// Next argument as raw bytes. Arguments are always sent as bulk strings.
    pub fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        let frame = self
            .parts
            .next()
            .ok_or(CommandParserError::NotEnoughArguments {
                command: self.command,
            })?;

        match frame {
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidArgument {
                command: self.command,
                expected: "bulk string",
                actual: frame.kind(),
            }),
        }
    }

    /// Fails if any argument has not been consumed.
    pub fn finish(&mut self) -> Result<(), CommandParserError> {
        if self.has_next() {
            return Err(CommandParserError::TooManyArguments {
                command: self.command,
            });
        }

        Ok(())
    }
}

/// Everything that can go wrong between receiving a frame and running a command. The messages
/// are sent to the client verbatim as error replies.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR expected array")]
    ExpectedArray,
    #[error("ERR empty command")]
    EmptyCommand,
    #[error("ERR invalid command name, expected bulk string, got {actual}")]
    InvalidCommandName { actual: &'static str },
    #[error("ERR unknown command: {command}")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command, not enough arguments")]
    NotEnoughArguments { command: &'static str },
    #[error("ERR wrong number of arguments for '{command}' command, too many arguments")]
    TooManyArguments { command: &'static str },
    #[error("ERR invalid argument for '{command}' command, expected {expected}, got {actual}")]
    InvalidArgument {
        command: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("ERR invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
}

impl From<CommandParserError> for Frame {
    fn from(err: CommandParserError) -> Self {
        Frame::Error(err.to_string())
    }
}
