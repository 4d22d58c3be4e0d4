use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Returns all keys matching `pattern`, in no particular order.
///
/// Only a restricted form of glob is understood: `*` matches every key, `prefix*` and
/// `*suffix` match by prefix and suffix, and anything else matches the identical key. A `*`
/// anywhere else is taken literally.
///
/// Ref: <https://redis.io/commands/keys>
#[derive(Debug, PartialEq)]
pub struct Keys {
    pub pattern: String,
}

impl Executable for Keys {
    const NAME: &'static str = "keys";

    fn exec(self, store: &Store) -> Frame {
        let keys = store
            .keys()
            .into_iter()
            .filter(|key| matches_pattern(&self.pattern, key))
            .map(|key| Frame::Bulk(Bytes::from(key)))
            .collect();

        Frame::Array(keys)
    }
}

impl TryFrom<&mut CommandParser> for Keys {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let pattern = parser.next_string()?;
        Ok(Self { pattern })
    }
}

fn matches_pattern(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return key.ends_with(suffix);
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return key.starts_with(prefix);
    }

    pattern == key
}
