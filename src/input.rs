use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper};

use crate::config;
use crate::core::error::DchatError;

/// Completes slash commands, and droid/model ids as their arguments. The
/// candidate lists are snapshots of the registries taken when the editor is
/// built.
pub struct ReplHelper {
    commands: Vec<String>,
    droids: Vec<String>,
    models: Vec<String>,
}

impl ReplHelper {
    pub fn new(commands: Vec<String>, droids: Vec<String>, models: Vec<String>) -> Self {
        Self {
            commands,
            droids,
            models,
        }
    }

    fn matches(candidates: &[String], partial: &str) -> Vec<Pair> {
        candidates
            .iter()
            .filter(|c| c.starts_with(partial))
            .map(|c| Pair {
                display: c.clone(),
                replacement: c.clone(),
            })
            .collect()
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((pos, Vec::new()));
        }

        let before_cursor = &line[..pos];
        let mut parts = before_cursor.splitn(2, ' ');
        let command = parts.next().unwrap_or("");

        match parts.next() {
            // Completing the command name itself
            None => Ok((1, Self::matches(&self.commands, &command[1..]))),
            // Completing the first argument
            Some(arg) => {
                let arg_start = pos - arg.len();
                let candidates = match command {
                    "/droid" | "/new" => Self::matches(&self.droids, arg),
                    "/model" => Self::matches(&self.models, arg),
                    _ => Vec::new(),
                };
                Ok((arg_start, candidates))
            }
        }
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Creates a configured rustyline editor with history loaded from the
/// config directory.
pub fn create_editor(helper: ReplHelper) -> Result<Editor<ReplHelper, FileHistory>, DchatError> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| DchatError::Input(format!("failed to create line editor: {}", e)))?;
    editor.set_helper(Some(helper));

    let _ = editor.load_history(&config::Config::history_path());

    Ok(editor)
}

/// Reads one line; `None` means the user asked to leave (Ctrl-C/Ctrl-D).
pub fn read_input(
    editor: &mut Editor<ReplHelper, FileHistory>,
) -> Result<Option<String>, DchatError> {
    let prompt = style("> ").bold().cyan().to_string();
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor
                    .add_history_entry(&line)
                    .map_err(|e| DchatError::Input(format!("failed to add history entry: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(DchatError::Input(format!("input error: {}", err))),
    }
}

/// Saves the editor history under the config directory.
pub fn save_history(editor: &mut Editor<ReplHelper, FileHistory>) -> Result<(), DchatError> {
    let history_path = config::Config::history_path();
    if let Some(parent) = history_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    editor
        .save_history(&history_path)
        .map_err(|e| DchatError::Input(format!("failed to save history: {}", e)))
}
