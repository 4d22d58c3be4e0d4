use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::{Scalar, Store};

/// Set `key` to hold the string `value`. If `key` already holds a value, it is overwritten.
///
/// The value is always stored as text, numeric interpretation is left to the commands that
/// need it.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
}

impl Executable for Set {
    const NAME: &'static str = "set";

    fn exec(self, store: &Store) -> Frame {
        store.set(self.key, Scalar::Text(self.value));

        Frame::Simple("OK".to_string())
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}
