use std::marker::PhantomData;

use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// A parsed command that can be run against the store.
pub trait Executable: Sized + for<'a> TryFrom<&'a mut CommandParser, Error = CommandParserError> {
    /// Lower-case command name, used in error replies.
    const NAME: &'static str;

    fn exec(self, store: &Store) -> Frame;
}

/// Turns the arguments of a command (everything after its name) into a reply.
///
/// Failures are reported as `Frame::Error` replies, never as panics, so a bad command can not
/// take the connection down.
pub trait Handler: Send + Sync {
    fn handle(&self, args: Vec<Frame>) -> Frame;
}

/// Handler for any [`Executable`] command: parses the arguments, rejects leftovers and runs the
/// command against the store.
pub struct CommandHandler<C> {
    store: Store,
    _command: PhantomData<fn() -> C>,
}

impl<C: Executable> CommandHandler<C> {
    pub fn new(store: Store) -> CommandHandler<C> {
        CommandHandler {
            store,
            _command: PhantomData,
        }
    }
}

impl<C: Executable> Handler for CommandHandler<C> {
    fn handle(&self, args: Vec<Frame>) -> Frame {
        let mut parser = CommandParser::new(C::NAME, args);

        let command = match C::try_from(&mut parser) {
            Ok(command) => command,
            Err(err) => return err.into(),
        };

        if let Err(err) = parser.finish() {
            return err.into();
        }

        command.exec(&self.store)
    }
}
