use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Removes the specified keys. A key is ignored if it does not exist. Returns the number of keys
/// that were removed.
///
/// Ref: <https://redis.io/commands/del>
#[derive(Debug, PartialEq)]
pub struct Del {
    pub keys: Vec<String>,
}

impl Executable for Del {
    const NAME: &'static str = "del";

    fn exec(self, store: &Store) -> Frame {
        let count = self.keys.iter().filter(|key| store.delete(key)).count();

        Frame::Integer(count as i64)
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let mut keys = vec![];

        loop {
            match parser.next_string() {
                Ok(key) => keys.push(key),
                Err(CommandParserError::NotEnoughArguments { .. }) if !keys.is_empty() => {
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Self { keys })
    }
}
