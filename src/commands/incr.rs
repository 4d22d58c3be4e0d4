use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Increments the number stored at key by one. A missing key is set to 1.
///
/// Ref: <https://redis.io/docs/latest/commands/incr/>
#[derive(Debug, PartialEq)]
pub struct Incr {
    pub key: String,
}

impl Executable for Incr {
    const NAME: &'static str = "incr";

    fn exec(self, store: &Store) -> Frame {
        match store.incr_by(&self.key, 1) {
            Ok(_) => Frame::Simple("OK".to_string()),
            Err(err) => Frame::Error(format!("ERR {}", err)),
        }
    }
}

impl TryFrom<&mut CommandParser> for Incr {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;

        Ok(Self { key })
    }
}
