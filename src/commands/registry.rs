use std::collections::HashMap;
use std::sync::Arc;

use crate::commands::ReplState;
use crate::commands::handler::CommandHandler;
use crate::core::error::DchatError;

pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: CommandHandler + 'static>(&mut self, name: &str, command: C) {
        self.handlers.insert(name.to_string(), Arc::new(command));
    }

    pub fn execute(
        &self,
        name: &str,
        args: &[&str],
        state: &mut ReplState<'_>,
    ) -> Result<Option<String>, DchatError> {
        self.handlers
            .get(name)
            .ok_or_else(|| DchatError::Input(format!("unknown command: /{}", name)))
            .and_then(|handler| handler.execute(state, args))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
