use console::style;

use crate::commands::ReplState;
use crate::core::error::DchatError;

pub trait CommandHandler: Send + Sync {
    fn execute(&self, state: &mut ReplState<'_>, args: &[&str])
    -> Result<Option<String>, DchatError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct HelpCommand;
pub struct NewChatCommand;
pub struct ReplyCommand;
pub struct DroidCommand;
pub struct DroidsCommand;
pub struct ModelCommand;
pub struct ModelsCommand;
pub struct ExportCommand;

impl CommandHandler for QuitCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        _args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the chat session"
    }
}

impl CommandHandler for HelpCommand {
    fn execute(
        &self,
        _state: &mut ReplState<'_>,
        _args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        let title = style("Available Commands").bold().underlined();
        let help_text = vec![
            title.to_string(),
            NewChatCommand.help().to_string(),
            ReplyCommand.help().to_string(),
            DroidCommand.help().to_string(),
            DroidsCommand.help().to_string(),
            ModelCommand.help().to_string(),
            ModelsCommand.help().to_string(),
            ExportCommand.help().to_string(),
            HelpCommand.help().to_string(),
            QuitCommand.help().to_string(),
        ]
        .join("\n");

        Ok(Some(help_text))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

impl CommandHandler for NewChatCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        let droid_id = args
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| state.session.active_droid.clone());
        state.engine.new_chat(state.session, &droid_id)?;
        Ok(Some(format!(
            "Started a new conversation with droid '{}'.",
            droid_id
        )))
    }

    fn help(&self) -> &'static str {
        "/new [droid] - Start a new conversation, optionally switching droid"
    }
}

impl CommandHandler for ReplyCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        _args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        if state.session.conversation.last_assistant().is_none() {
            return Ok(Some("Nothing to reply to yet.".to_string()));
        }
        state.pending_reply = true;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/reply - Prompt for a follow-up to the last answer"
    }
}

impl CommandHandler for DroidCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        match args.first() {
            None => Ok(Some(format!(
                "Current droid: {}",
                state.session.active_droid
            ))),
            Some(id) => {
                state.engine.select_droid(state.session, id)?;
                Ok(Some(format!(
                    "Droid set to '{}'. Takes effect on the next turn.",
                    id
                )))
            }
        }
    }

    fn help(&self) -> &'static str {
        "/droid <id> - Show or change the active droid"
    }
}

impl CommandHandler for DroidsCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        _args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        let lines: Vec<String> = state
            .engine
            .droids()
            .iter()
            .map(|droid| {
                let summary = droid.system_prompt.lines().next().unwrap_or("");
                format!("{}  {}", style(&droid.id).bold(), style(summary).dim())
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/droids - List registered droids"
    }
}

impl CommandHandler for ModelCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        match args.first() {
            None => Ok(Some(format!(
                "Current model: {}",
                state.session.active_model
            ))),
            Some(id) => {
                state.engine.select_model(state.session, id)?;
                Ok(Some(format!("Model changed to: {}", id)))
            }
        }
    }

    fn help(&self) -> &'static str {
        "/model <id> - Show or change the active model"
    }
}

impl CommandHandler for ModelsCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        _args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        Ok(Some(state.engine.models().ids().join("\n")))
    }

    fn help(&self) -> &'static str {
        "/models - List registered models"
    }
}

impl CommandHandler for ExportCommand {
    fn execute(
        &self,
        state: &mut ReplState<'_>,
        args: &[&str],
    ) -> Result<Option<String>, DchatError> {
        let message = state.host.export_revised(args.first().copied())?;
        Ok(Some(message))
    }

    fn help(&self) -> &'static str {
        "/export [path] - Write the last diff's revised text to a file or stdout"
    }
}
