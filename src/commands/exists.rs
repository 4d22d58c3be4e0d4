use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Returns 1 if `key` exists, 0 otherwise.
///
/// Ref: <https://redis.io/docs/latest/commands/exists/>
#[derive(Debug, PartialEq)]
pub struct Exists {
    pub key: String,
}

impl Executable for Exists {
    const NAME: &'static str = "exists";

    fn exec(self, store: &Store) -> Frame {
        Frame::Integer(store.exists(&self.key) as i64)
    }
}

impl TryFrom<&mut CommandParser> for Exists {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Router;
    use bytes::Bytes;

    fn exists(key: &'static str) -> Frame {
        Frame::Array(vec![
            Frame::Bulk(Bytes::from("EXISTS")),
            Frame::Bulk(Bytes::from(key)),
        ])
    }

    #[test]
    fn existing_and_missing_keys() {
        let store = Store::new();
        store.set("key1", "value");
        let router = Router::new(store);

        assert_eq!(router.route(exists("key1")), Frame::Integer(1));
        assert_eq!(router.route(exists("key1")), Frame::Integer(1));
        assert_eq!(router.route(exists("key2")), Frame::Integer(0));
    }

    #[test]
    fn exactly_one_key() {
        let router = Router::new(Store::new());

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("EXISTS")),
            Frame::Bulk(Bytes::from("a")),
            Frame::Bulk(Bytes::from("b")),
        ]);

        assert_eq!(
            router.route(frame),
            Frame::Error(
                "ERR wrong number of arguments for 'exists' command, too many arguments"
                    .to_string()
            )
        );
    }
}
