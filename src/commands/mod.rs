pub mod dispatcher;
pub mod handler;
pub mod registry;

pub use dispatcher::create_command_dispatcher;

use crate::app::ConsoleHost;
use crate::core::session::Session;
use crate::engine::Engine;

/// Mutable view of the REPL handed to command handlers for one dispatch.
/// Flags set here are read back by the loop after the command returns.
pub struct ReplState<'a> {
    pub session: &'a mut Session,
    pub engine: &'a Engine,
    pub host: &'a mut ConsoleHost,
    pub should_continue: bool,
    /// Set by `/reply`; the loop runs the (async) turn itself.
    pub pending_reply: bool,
}

impl<'a> ReplState<'a> {
    pub fn new(
        session: &'a mut Session,
        engine: &'a Engine,
        host: &'a mut ConsoleHost,
    ) -> Self {
        Self {
            session,
            engine,
            host,
            should_continue: true,
            pending_reply: false,
        }
    }
}
