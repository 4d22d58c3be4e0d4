use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Increments the number stored at key by `increment`.
///
/// Ref: <https://redis.io/docs/latest/commands/incrby/>
#[derive(Debug, PartialEq)]
pub struct IncrBy {
    pub key: String,
    pub increment: i64,
}

impl Executable for IncrBy {
    const NAME: &'static str = "incrby";

    fn exec(self, store: &Store) -> Frame {
        match store.incr_by(&self.key, self.increment) {
            Ok(_) => Frame::Simple("OK".to_string()),
            Err(err) => Frame::Error(format!("ERR {}", err)),
        }
    }
}

impl TryFrom<&mut CommandParser> for IncrBy {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let increment = parser.next_integer()?;

        Ok(Self { key, increment })
    }
}
