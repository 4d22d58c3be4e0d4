use std::collections::HashMap;
use tracing::debug;

use crate::commands::del::Del;
use crate::commands::executable::{CommandHandler, Executable, Handler};
use crate::commands::exists::Exists;
use crate::commands::get::Get;
use crate::commands::incr::Incr;
use crate::commands::incrby::IncrBy;
use crate::commands::keys::Keys;
use crate::commands::ping::Ping;
use crate::commands::set::Set;
use crate::commands::CommandParserError;
use crate::frame::Frame;
use crate::store::Store;

/// Dispatch table from upper-cased command name to handler.
///
/// Every server owns its own router, so independent servers (and tests) never share handlers.
pub struct Router {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl Router {
    /// A router with the built-in command set registered against `store`.
    pub fn new(store: Store) -> Router {
        let mut router = Router::empty();

        router.register_command::<Ping>(&store);
        router.register_command::<Set>(&store);
        router.register_command::<Get>(&store);
        router.register_command::<Del>(&store);
        router.register_command::<Exists>(&store);
        router.register_command::<Keys>(&store);
        router.register_command::<Incr>(&store);
        router.register_command::<IncrBy>(&store);

        router
    }

    /// A router without any command.
    pub fn empty() -> Router {
        Router {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `name`, replacing any previous handler for it. Names are case
    /// insensitive.
    pub fn register(&mut self, name: &str, handler: impl Handler + 'static) {
        self.handlers.insert(name.to_uppercase(), Box::new(handler));
    }

    fn register_command<C: Executable + 'static>(&mut self, store: &Store) {
        self.register(C::NAME, CommandHandler::<C>::new(store.clone()));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_uppercase())
    }

    /// Runs a command and returns its reply.
    ///
    /// `frame` must be a non-empty array whose first element names a registered command. Every
    /// failure is turned into an error reply.
    pub fn route(&self, frame: Frame) -> Frame {
        match self.try_route(frame) {
            Ok(res) => res,
            Err(err) => err.into(),
        }
    }

    fn try_route(&self, frame: Frame) -> Result<Frame, CommandParserError> {
        // Clients send commands to the server as RESP arrays.
        let mut parts = match frame {
            Frame::Array(parts) => parts.into_iter(),
            _ => return Err(CommandParserError::ExpectedArray),
        };

        let name = match parts.next() {
            Some(Frame::Bulk(bytes)) => String::from_utf8_lossy(&bytes).to_uppercase(),
            Some(Frame::Simple(s)) => s.to_uppercase(),
            Some(frame) => {
                return Err(CommandParserError::InvalidCommandName {
                    actual: frame.kind(),
                })
            }
            None => return Err(CommandParserError::EmptyCommand),
        };

        let handler = self
            .handlers
            .get(&name)
            .ok_or_else(|| CommandParserError::UnknownCommand {
                command: name.clone(),
            })?;

        debug!(command = %name, "dispatching command");

        Ok(handler.handle(parts.collect()))
    }
}
