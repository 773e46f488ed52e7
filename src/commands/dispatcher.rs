use std::sync::Arc;

use crate::commands::ReplState;
use crate::commands::handler::{
    DroidCommand, DroidsCommand, ExportCommand, HelpCommand, ModelCommand, ModelsCommand,
    NewChatCommand, QuitCommand, ReplyCommand,
};
use crate::commands::registry::CommandRegistry;
use crate::core::error::DchatError;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ReplState<'_>,
    ) -> Result<Option<String>, DchatError> {
        self.registry.execute(command, args, state)
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_dispatcher() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("help", HelpCommand);
    registry.register("new", NewChatCommand);
    registry.register("reply", ReplyCommand);
    registry.register("droid", DroidCommand);
    registry.register("droids", DroidsCommand);
    registry.register("model", ModelCommand);
    registry.register("models", ModelsCommand);
    registry.register("export", ExportCommand);

    CommandDispatcher::new(Arc::new(registry))
}
