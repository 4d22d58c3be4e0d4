use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::{Scalar, Store};

/// Get the value of `key`. If the key does not exist the special value `nil` is returned.
///
/// Text values are returned as bulk strings and integer values as integers.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Executable for Get {
    const NAME: &'static str = "get";

    fn exec(self, store: &Store) -> Frame {
        match store.get(&self.key) {
            Some(Scalar::Text(data)) => Frame::Bulk(data),
            Some(Scalar::Integer(i)) => Frame::Integer(i),
            None => Frame::Null,
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}
