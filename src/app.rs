use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use console::Term;
use is_terminal::IsTerminal;
use tracing::warn;

use crate::cli::Args;
use crate::commands::dispatcher::CommandDispatcher;
use crate::commands::{ReplState, create_command_dispatcher};
use crate::config::{Config, Credentials};
use crate::core::error::DchatError;
use crate::core::session::Session;
use crate::diff::DiffReport;
use crate::display;
use crate::droids::{Droid, DroidRegistry};
use crate::engine::pipeline::ShowDiff;
use crate::engine::{Engine, Host, TurnOptions};
use crate::input;
use crate::providers::ModelRegistry;
use crate::providers::client::HttpTransport;
use crate::providers::registry::{DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_OPENAI_BASE_URL};

/// Terminal implementation of the engine's host interface. Renders the
/// transcript and diff views, keeps the last revised text for `/export`,
/// and owns the buffer targeted by rewrite turns.
pub struct ConsoleHost {
    echo: bool,
    transcript_log: Option<PathBuf>,
    last_revised: Option<String>,
    pub buffer: Option<String>,
}

impl ConsoleHost {
    pub fn new(transcript_log: Option<PathBuf>) -> Self {
        Self {
            echo: true,
            transcript_log,
            last_revised: None,
            buffer: None,
        }
    }

    /// Stop echoing to stdout; used when stdout carries the rewritten
    /// buffer. The transcript log keeps receiving turns.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    fn append_transcript(&self, text: &str) {
        let Some(path) = &self.transcript_log else {
            return;
        };
        let stamped = format!(
            "[{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            text.trim_end()
        );
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(stamped.as_bytes()));
        if let Err(err) = result {
            warn!(error = %err, "failed to append transcript log");
        }
    }

    /// Hand back the revised text of the last diff: written to `path` when
    /// given, returned for display otherwise.
    pub fn export_revised(&self, path: Option<&str>) -> Result<String, DchatError> {
        let Some(revised) = &self.last_revised else {
            return Ok("No diff to export yet.".to_string());
        };
        match path {
            Some(path) => {
                fs::write(path, revised)?;
                Ok(format!("Wrote {} bytes to {}", revised.len(), path))
            }
            None => Ok(revised.clone()),
        }
    }
}

impl Host for ConsoleHost {
    fn render_transcript(&mut self, text: &str) {
        if self.echo {
            display::render_transcript(text);
        }
        self.append_transcript(text);
    }

    fn show_diff(&mut self, report: &DiffReport) {
        self.last_revised = Some(report.revised.clone());
        if self.echo {
            display::render_diff(report);
        }
    }

    fn prompt_for_text(&mut self, label: &str) -> Option<String> {
        let term = Term::stdout();
        print!("{}: ", label);
        let _ = io::stdout().flush();
        term.read_line()
            .ok()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        match &mut self.buffer {
            Some(buffer) => buffer.replace_range(start..end, text),
            None => warn!("region replacement requested but no buffer is attached"),
        }
    }
}

pub struct Application {
    args: Args,
    engine: Engine,
    session: Session,
    host: ConsoleHost,
    dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(args: Args, config: Config) -> Result<Self, DchatError> {
        let mut droids = DroidRegistry::with_builtins();
        for entry in &config.droids {
            let mut droid = Droid::new(&entry.id, &entry.system_prompt)
                .with_framing(entry.prompt_prefix.clone(), entry.prompt_suffix.clone());
            if entry.show_diff {
                droid = droid.with_post(Arc::new(ShowDiff));
            }
            droids.register(droid)?;
        }

        let models = ModelRegistry::with_builtins(
            &config.base_url_for("openai", DEFAULT_OPENAI_BASE_URL),
            &config.base_url_for("anthropic", DEFAULT_ANTHROPIC_BASE_URL),
        );

        let credentials = Credentials::resolve(&config);
        let transport = HttpTransport::new()?;
        let engine = Engine::new(droids, models, credentials, Box::new(transport));

        let droid_id = args
            .droid
            .clone()
            .or_else(|| config.default_droid.clone())
            .unwrap_or_else(|| {
                if args.rewrite {
                    "rewriter".to_string()
                } else {
                    "assistant".to_string()
                }
            });
        let model_id = args
            .model
            .clone()
            .or_else(|| config.default_model.clone())
            .unwrap_or_else(|| "gpt-4.1-mini".to_string());

        // Bad selections fail here, not at the first turn.
        engine.droids().resolve(&droid_id)?;
        engine.models().resolve(&model_id)?;

        let session = Session::new(droid_id, model_id);
        let host = ConsoleHost::new(config.transcript.then(Config::transcript_path));
        let dispatcher = create_command_dispatcher();

        Ok(Self {
            args,
            engine,
            session,
            host,
            dispatcher,
        })
    }

    pub async fn run(&mut self) -> Result<(), DchatError> {
        if self.args.list_droids {
            for id in self.engine.droids().ids() {
                println!("{}", id);
            }
            return Ok(());
        }

        if self.args.rewrite {
            self.run_rewrite().await
        } else if self.args.chat {
            self.run_repl().await
        } else {
            self.run_one_shot().await
        }
    }

    async fn run_one_shot(&mut self) -> Result<(), DchatError> {
        let piped = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| DchatError::Input(format!("failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };

        let prompt = match (self.args.query.as_deref(), piped) {
            (Some(query), Some(context)) => format!("{}\n\n{}", context.trim_end(), query),
            (None, Some(context)) => context,
            (Some(query), None) => query.to_string(),
            (None, None) => {
                return Err(DchatError::Input(
                    "no prompt given; pass a prompt or use --chat".to_string(),
                ));
            }
        };

        self.engine
            .send_turn(
                &mut self.session,
                &mut self.host,
                &prompt,
                TurnOptions::default(),
            )
            .await?;
        Ok(())
    }

    async fn run_repl(&mut self) -> Result<(), DchatError> {
        println!(
            "Chatting with droid '{}' on {}. Type '/help' for commands, Ctrl-D to exit.",
            self.session.active_droid, self.session.active_model
        );

        let helper = input::ReplHelper::new(
            self.dispatcher.get_command_names(),
            self.engine.droids().ids(),
            self.engine.models().ids(),
        );
        let mut editor = input::create_editor(helper)?;

        loop {
            let Some(line) = input::read_input(&mut editor)? else {
                break;
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('/') {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let Some((command, command_args)) = parts.split_first() else {
                    continue;
                };

                let mut state =
                    ReplState::new(&mut self.session, &self.engine, &mut self.host);
                match self.dispatcher.execute(command, command_args, &mut state) {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(err) => display::render_error(&err),
                }
                let should_continue = state.should_continue;
                let pending_reply = state.pending_reply;

                if pending_reply {
                    if let Err(err) = self
                        .engine
                        .reply_to_last(&mut self.session, &mut self.host)
                        .await
                    {
                        display::render_error(&err);
                    }
                }
                if !should_continue {
                    break;
                }
                continue;
            }

            if let Err(err) = self
                .engine
                .send_turn(
                    &mut self.session,
                    &mut self.host,
                    &line,
                    TurnOptions::default(),
                )
                .await
            {
                display::render_error(&err);
            }
        }

        input::save_history(&mut editor)?;
        Ok(())
    }

    async fn run_rewrite(&mut self) -> Result<(), DchatError> {
        let buffer = match &self.args.file {
            Some(path) => fs::read_to_string(path)?,
            None => {
                if io::stdin().is_terminal() {
                    return Err(DchatError::Input(
                        "nothing to rewrite; pipe text in or pass --file".to_string(),
                    ));
                }
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
        };

        let (start, end) = self.args.span.unwrap_or((0, buffer.len()));

        // Filter mode: stdout carries the edited buffer, so keep the
        // transcript and diff views off it.
        if self.args.file.is_none() {
            self.host.set_echo(false);
        }

        self.host.buffer = Some(buffer.clone());
        self.engine
            .send_and_replace(&mut self.session, &mut self.host, &buffer, start, end)
            .await?;
        let edited = self.host.buffer.take().unwrap_or(buffer);

        match (&self.args.file, self.args.in_place) {
            (Some(path), true) => {
                fs::write(path, &edited)?;
                display::render_notice(&format!("wrote {}", path.display()));
            }
            (Some(_), false) => {
                display::render_notice("run again with --in-place to apply");
            }
            (None, _) => {
                print!("{}", edited);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}
