pub mod pipeline;
pub mod region;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Credentials;
use crate::core::error::DchatError;
use crate::core::message::Role;
use crate::core::session::Session;
use crate::diff::DiffReport;
use crate::droids::DroidRegistry;
use crate::providers::client::Transport;
use crate::providers::{ModelRegistry, WireFormat, wire};
use pipeline::{Pipeline, Processor, RegionSpec, ReplaceRegion};

/// The interface the engine consumes from its host (terminal app, editor
/// plugin, test harness). Everything here is a synchronous side effect.
pub trait Host {
    fn render_transcript(&mut self, text: &str);
    fn show_diff(&mut self, report: &DiffReport);
    fn prompt_for_text(&mut self, label: &str) -> Option<String>;
    fn replace_range(&mut self, start: usize, end: usize, text: &str);
}

/// Per-call turn configuration. `extra_post` is appended to the end of the
/// post-processor chain for this call only.
#[derive(Default)]
pub struct TurnOptions {
    pub region: Option<RegionSpec>,
    pub extra_post: Option<Arc<dyn Processor>>,
}

/// The session/dispatch engine: registries, the processor pipeline and the
/// provider-agnostic dispatcher. Sessions are passed in `&mut`, so turns on
/// one session are serialized by construction.
pub struct Engine {
    droids: DroidRegistry,
    models: ModelRegistry,
    credentials: Credentials,
    transport: Box<dyn Transport>,
    pipeline: Pipeline,
}

impl Engine {
    pub fn new(
        droids: DroidRegistry,
        models: ModelRegistry,
        credentials: Credentials,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            droids,
            models,
            credentials,
            transport,
            pipeline: Pipeline::standard(),
        }
    }

    pub fn droids(&self) -> &DroidRegistry {
        &self.droids
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Start a new conversation with the given droid. The previous log is
    /// discarded; the active model is kept.
    pub fn new_chat(&self, session: &mut Session, droid_id: &str) -> Result<(), DchatError> {
        self.droids.resolve(droid_id)?;
        session.reset(droid_id);
        Ok(())
    }

    /// Switch the active model. Only affects how subsequent turns are
    /// encoded and parsed; the log is untouched.
    pub fn select_model(&self, session: &mut Session, model_id: &str) -> Result<(), DchatError> {
        self.models.resolve(model_id)?;
        session.active_model = model_id.to_string();
        Ok(())
    }

    /// Switch the active droid without starting a new conversation.
    pub fn select_droid(&self, session: &mut Session, droid_id: &str) -> Result<(), DchatError> {
        self.droids.resolve(droid_id)?;
        session.active_droid = droid_id.to_string();
        Ok(())
    }

    /// Run one full turn: framing, pre-processors, dispatch, parse,
    /// post-processors. On transport or parse failure the conversation is
    /// rolled back to its pre-turn state and the error is returned.
    pub async fn send_turn(
        &self,
        session: &mut Session,
        host: &mut dyn Host,
        prompt: &str,
        options: TurnOptions,
    ) -> Result<String, DchatError> {
        let droid = self.droids.resolve(&session.active_droid)?;
        let model = self.models.resolve(&session.active_model)?;
        let api_key = self
            .credentials
            .get(&model.provider)
            .ok_or_else(|| DchatError::MissingCredentials(model.provider.clone()))?
            .to_string();

        let framed = if session.conversation.is_fresh() {
            droid.frame(prompt)
        } else {
            prompt.to_string()
        };

        self.pipeline.run_pre(host, &droid, &framed)?;

        session.conversation.push(Role::User, framed);
        let mut seeded_system = false;
        if model.wire.embeds_system() && !session.conversation.has_system() {
            session.conversation.insert_system(droid.system_prompt.clone());
            seeded_system = true;
        }

        let system = match model.wire {
            WireFormat::AnthropicMessages => Some(droid.system_prompt.as_str()),
            WireFormat::ChatCompletions => None,
        };
        let body = wire::build_request(
            model.wire,
            &model.id,
            session.conversation.messages(),
            system,
        )?;
        let headers = model.build_headers(&api_key);

        debug!(model = %model.id, droid = %droid.id, "dispatching turn");

        let reply = match self.transport.post(&model.endpoint, &headers, &body).await {
            Ok(raw) => wire::parse_reply(model.wire, &raw),
            Err(err) => Err(err),
        };

        let content = match reply {
            Ok(content) => content,
            Err(err) => {
                session.conversation.pop();
                if seeded_system {
                    session.conversation.remove_system();
                }
                warn!(error = %err, "turn failed, conversation rolled back");
                return Err(err);
            }
        };

        session.conversation.push(Role::Assistant, content.clone());
        self.pipeline.run_post(
            host,
            &droid,
            prompt,
            &content,
            options.region,
            options.extra_post.as_deref(),
        )?;

        Ok(content)
    }

    /// Ask the host for a follow-up and send it as the next turn of the
    /// current conversation.
    pub async fn reply_to_last(
        &self,
        session: &mut Session,
        host: &mut dyn Host,
    ) -> Result<String, DchatError> {
        if session.conversation.last_assistant().is_none() {
            return Err(DchatError::Input("nothing to reply to yet".to_string()));
        }
        let Some(text) = host.prompt_for_text("reply") else {
            return Err(DchatError::Input("reply aborted".to_string()));
        };
        self.send_turn(session, host, &text, TurnOptions::default())
            .await
    }

    /// Use `buffer[start..end]` as the prompt and splice the reply back
    /// over that span via the host, honoring the trailing-newline rule.
    pub async fn send_and_replace(
        &self,
        session: &mut Session,
        host: &mut dyn Host,
        buffer: &str,
        start: usize,
        end: usize,
    ) -> Result<String, DchatError> {
        if start > end
            || end > buffer.len()
            || !buffer.is_char_boundary(start)
            || !buffer.is_char_boundary(end)
        {
            return Err(DchatError::Input(format!(
                "invalid region {}..{} for a buffer of {} bytes",
                start,
                end,
                buffer.len()
            )));
        }

        let prompt = &buffer[start..end];
        let options = TurnOptions {
            region: Some(RegionSpec {
                start,
                end,
                prompt_had_trailing_newline: prompt.ends_with('\n'),
            }),
            extra_post: Some(Arc::new(ReplaceRegion)),
        };
        self.send_turn(session, host, prompt, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::droids::Droid;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type RequestLog = Arc<Mutex<Vec<(String, Value)>>>;

    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<String, String>>>,
        requests: RequestLog,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<&str, &str>>) -> (Self, RequestLog) {
            let requests: RequestLog = Arc::default();
            let transport = Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                requests: requests.clone(),
            };
            (transport, requests)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(
            &self,
            url: &str,
            _headers: &[(String, String)],
            body: &Value,
        ) -> Result<String, DchatError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(DchatError::Transport(message)),
                None => Err(DchatError::Transport("no scripted reply left".to_string())),
            }
        }
    }

    struct NullHost {
        reply_text: Option<String>,
        buffer: String,
    }

    impl NullHost {
        fn new() -> Self {
            Self {
                reply_text: None,
                buffer: String::new(),
            }
        }
    }

    impl Host for NullHost {
        fn render_transcript(&mut self, _text: &str) {}
        fn show_diff(&mut self, _report: &DiffReport) {}
        fn prompt_for_text(&mut self, _label: &str) -> Option<String> {
            self.reply_text.take()
        }
        fn replace_range(&mut self, start: usize, end: usize, text: &str) {
            self.buffer.replace_range(start..end, text);
        }
    }

    fn engine_with(replies: Vec<Result<&str, &str>>, droids: Vec<Droid>) -> (Engine, RequestLog) {
        let mut droid_registry = DroidRegistry::with_builtins();
        for droid in droids {
            droid_registry.register(droid).unwrap();
        }
        let models = ModelRegistry::default();
        let mut credentials = Credentials::empty();
        credentials.set("openai", "sk-test");
        credentials.set("anthropic", "sk-ant-test");
        let (transport, requests) = ScriptedTransport::new(replies);
        let engine = Engine::new(droid_registry, models, credentials, Box::new(transport));
        (engine, requests)
    }

    #[tokio::test]
    async fn end_to_end_embedded_system_turn() {
        let (engine, _requests) = engine_with(
            vec![Ok(r#"{"choices":[{"message":{"content":"4"}}]}"#)],
            vec![],
        );
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        let content = engine
            .send_turn(&mut session, &mut host, "2+2?", TurnOptions::default())
            .await
            .unwrap();

        assert_eq!(content, "4");
        let log = session.conversation.messages();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].role, Role::System);
        assert_eq!(log[0].content, "You are a helpful assistant.");
        assert_eq!((log[1].role, log[1].content.as_str()), (Role::User, "2+2?"));
        assert_eq!((log[2].role, log[2].content.as_str()), (Role::Assistant, "4"));
    }

    #[tokio::test]
    async fn framing_applies_to_first_turn_only() {
        let droid = Droid::new("framed", "sys")
            .with_framing(Some("Q: ".to_string()), Some(" ?".to_string()));
        let (engine, requests) = engine_with(
            vec![
                Ok(r#"{"choices":[{"message":{"content":"a1"}}]}"#),
                Ok(r#"{"choices":[{"message":{"content":"a2"}}]}"#),
            ],
            vec![droid],
        );
        let mut session = Session::new("framed", "gpt-4.1-mini");
        let mut host = NullHost::new();

        engine
            .send_turn(&mut session, &mut host, "hello", TurnOptions::default())
            .await
            .unwrap();
        engine
            .send_turn(&mut session, &mut host, "more", TurnOptions::default())
            .await
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].1["messages"][1]["content"], "Q: hello ?");
        let second = requests[1].1["messages"].as_array().unwrap();
        assert_eq!(second.last().unwrap()["content"], "more");
    }

    #[tokio::test]
    async fn separate_system_format_never_logs_a_system_message() {
        let (engine, requests) = engine_with(vec![Ok(r#"{"content":[{"text":"hi"}]}"#)], vec![]);
        let mut session = Session::new("assistant", "claude-sonnet-4-20250514");
        let mut host = NullHost::new();

        engine
            .send_turn(&mut session, &mut host, "hello", TurnOptions::default())
            .await
            .unwrap();

        assert!(!session.conversation.has_system());
        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].1["system"], "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn missing_credentials_abort_before_any_state_change() {
        let droids = DroidRegistry::with_builtins();
        let (transport, _requests) = ScriptedTransport::new(vec![]);
        let engine = Engine::new(
            droids,
            ModelRegistry::default(),
            Credentials::empty(),
            Box::new(transport),
        );
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        let err = engine
            .send_turn(&mut session, &mut host, "hello", TurnOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DchatError::MissingCredentials(p) if p == "openai"));
        assert!(session.conversation.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_rolls_the_conversation_back() {
        let (engine, _requests) = engine_with(vec![Err("connection refused")], vec![]);
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        let err = engine
            .send_turn(&mut session, &mut host, "hello", TurnOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DchatError::Transport(_)));
        assert!(session.conversation.is_empty());
        assert!(session.conversation.is_fresh());
    }

    #[tokio::test]
    async fn malformed_response_is_surfaced_and_rolled_back() {
        let (engine, _requests) = engine_with(vec![Ok(r#"{"choices":[]}"#)], vec![]);
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        let err = engine
            .send_turn(&mut session, &mut host, "hello", TurnOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DchatError::MalformedResponse(_)));
        assert!(session.conversation.is_empty());
    }

    #[tokio::test]
    async fn switching_models_mid_conversation_keeps_history() {
        let (engine, requests) = engine_with(
            vec![
                Ok(r#"{"choices":[{"message":{"content":"first"}}]}"#),
                Ok(r#"{"content":[{"text":"second"}]}"#),
            ],
            vec![],
        );
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        engine
            .send_turn(&mut session, &mut host, "one", TurnOptions::default())
            .await
            .unwrap();
        let before: Vec<String> = session
            .conversation
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();

        engine.select_model(&mut session, "claude-sonnet-4-20250514").unwrap();
        engine
            .send_turn(&mut session, &mut host, "two", TurnOptions::default())
            .await
            .unwrap();

        let after: Vec<String> = session
            .conversation
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(&after[..before.len()], &before[..]);

        // The second request filters the embedded system message out.
        let requests = requests.lock().unwrap();
        let roles: Vec<&str> = requests[1].1["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert!(!roles.contains(&"system"));
    }

    #[tokio::test]
    async fn send_and_replace_splices_the_region() {
        let (engine, _requests) = engine_with(
            vec![Ok(r#"{"choices":[{"message":{"content":"fixed"}}]}"#)],
            vec![],
        );
        let mut session = Session::new("rewriter", "gpt-4.1-mini");
        let mut host = NullHost::new();
        host.buffer = "keep\nfix this\nkeep\n".to_string();
        let buffer = host.buffer.clone();

        engine
            .send_and_replace(&mut session, &mut host, &buffer, 5, 14)
            .await
            .unwrap();

        assert_eq!(host.buffer, "keep\nfixed\nkeep\n");
    }

    #[tokio::test]
    async fn send_and_replace_rejects_bad_ranges() {
        let (engine, _requests) = engine_with(vec![], vec![]);
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        let err = engine
            .send_and_replace(&mut session, &mut host, "short", 2, 99)
            .await
            .unwrap_err();
        assert!(matches!(err, DchatError::Input(_)));
        assert!(session.conversation.is_empty());
    }

    #[tokio::test]
    async fn reply_to_last_requires_an_assistant_message() {
        let (engine, _requests) = engine_with(vec![], vec![]);
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        let err = engine
            .reply_to_last(&mut session, &mut host)
            .await
            .unwrap_err();
        assert!(matches!(err, DchatError::Input(_)));
    }

    #[tokio::test]
    async fn reply_to_last_sends_the_prompted_text() {
        let (engine, requests) = engine_with(
            vec![
                Ok(r#"{"choices":[{"message":{"content":"first"}}]}"#),
                Ok(r#"{"choices":[{"message":{"content":"second"}}]}"#),
            ],
            vec![],
        );
        let mut session = Session::new("assistant", "gpt-4.1-mini");
        let mut host = NullHost::new();

        engine
            .send_turn(&mut session, &mut host, "one", TurnOptions::default())
            .await
            .unwrap();

        host.reply_text = Some("and then?".to_string());
        let content = engine.reply_to_last(&mut session, &mut host).await.unwrap();

        assert_eq!(content, "second");
        let requests = requests.lock().unwrap();
        let last = requests[1].1["messages"].as_array().unwrap();
        assert_eq!(last.last().unwrap()["content"], "and then?");
    }
}
