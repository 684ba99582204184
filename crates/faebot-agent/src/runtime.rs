use std::sync::Arc;
use std::time::Instant;

use faebot_audit::{AuditSink, GenerationRecord};
use faebot_channels::{ChannelError, ChatChannel, InboundMessage};
use faebot_core::config::{BotConfig, DEFAULT_MAX_NEW_TOKENS};
use faebot_core::ChannelName;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::commands::{self, Caller, CommandContext, Effect};
use crate::pipeline::decide::{should_reply, thread_draw};
use crate::pipeline::generate::{Generation, APOLOGY};
use crate::pipeline::prompt::build_prompt;
use crate::pipeline::truncate::truncate_for_chat;
use crate::provider::{GenerationProvider, GenerationRequest};
use crate::registry::{ConversationRegistry, SharedState};
use crate::roster::ModelRoster;
use crate::sampling::roll_params;
use crate::state::{ChannelDefaults, ChannelState};

/// Central bot runtime: owns the conversation registry and the handles to
/// the chat transport, the generation provider and the audit sink.
/// Shared between the ingestion loop and spawned generation tasks via `Arc`.
pub struct Bot {
    config: BotConfig,
    roster: ModelRoster,
    max_new_tokens: u32,
    registry: ConversationRegistry,
    /// Channels the bot is in, as reported by `join` with no argument.
    joined: RwLock<Vec<ChannelName>>,
    provider: Arc<dyn GenerationProvider>,
    chat: Arc<dyn ChatChannel>,
    audit: Arc<dyn AuditSink>,
}

impl Bot {
    pub fn new(
        config: BotConfig,
        roster: ModelRoster,
        provider: Arc<dyn GenerationProvider>,
        chat: Arc<dyn ChatChannel>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            roster,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            registry: ConversationRegistry::new(),
            joined: RwLock::new(Vec::new()),
            provider,
            chat,
            audit,
        }
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Seed the joined-channel list with the channels the transport joins on
    /// connect.
    pub fn with_channels(mut self, channels: Vec<ChannelName>) -> Self {
        let mut joined: Vec<ChannelName> = Vec::with_capacity(channels.len());
        for channel in channels {
            if !channel.is_empty() && !joined.contains(&channel) {
                joined.push(channel);
            }
        }
        self.joined = RwLock::new(joined);
        self
    }

    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    pub async fn joined_channels(&self) -> Vec<ChannelName> {
        self.joined.read().await.clone()
    }

    /// Consume inbound messages in arrival order until the sender side closes.
    /// Generations run detached; this loop never waits on the provider.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
        info!("inbound stream closed, ingestion loop exiting");
    }

    /// Process one inbound message. Returns the handle of the generation task
    /// if one was started.
    pub async fn handle(self: &Arc<Self>, msg: InboundMessage) -> Option<JoinHandle<()>> {
        if msg.echo {
            return None;
        }
        debug!(channel = %msg.channel, author = %msg.author, "message received");

        let shared = self
            .registry
            .get_or_create(&msg.channel, |c| self.new_state(c));

        if let Some(inv) = commands::parse_command(&msg.text, &self.config.prefixes) {
            self.run_command(&shared, &msg, &inv.name, inv.args).await;
            return None;
        }

        let reply = {
            let mut state = shared.lock().await;
            state.push_line(&msg.author, &msg.text);
            should_reply(&msg.text, &state, &self.config.name, thread_draw)
        };
        if !reply {
            return None;
        }
        Some(self.spawn_generation(msg.channel))
    }

    pub fn spawn_generation(self: &Arc<Self>, channel: ChannelName) -> JoinHandle<()> {
        let bot = Arc::clone(self);
        tokio::spawn(async move { bot.generate(&channel).await })
    }

    /// Build a prompt for `channel`, call the provider and deliver the outcome.
    ///
    /// No lock is held across the provider call, so generations for the same
    /// channel may overlap. If the channel's state is removed (or replaced)
    /// while the call is in flight, the result is dropped.
    pub async fn generate(&self, channel: &ChannelName) {
        let Some(shared) = self.registry.get(channel) else {
            debug!(channel = %channel, "no state for channel, skipping generation");
            return;
        };

        let (assembled, model) = {
            let mut state = shared.lock().await;
            let assembled = build_prompt(&mut state, &self.config.name);
            (assembled, state.current_model.clone())
        };
        let request = GenerationRequest {
            model,
            prompt: assembled.prompt,
            persona: assembled.persona,
            params: roll_params(&mut rand::thread_rng(), self.max_new_tokens),
        };

        info!(
            channel = %channel,
            model = %request.model,
            provider = %self.provider.name(),
            lines = assembled.transcript.len(),
            "generation started"
        );
        let started = Instant::now();
        let result = self.provider.generate(&request).await;
        let outcome = Generation::classify(result, self.config.message_limit);
        info!(
            channel = %channel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation finished"
        );

        let live = self
            .registry
            .get(channel)
            .is_some_and(|current| Arc::ptr_eq(&current, &shared));
        if !live {
            info!(channel = %channel, "channel left during generation, reply dropped");
            return;
        }

        match outcome {
            Generation::Complete(text) => {
                let sent = self.deliver(channel, &text).await;
                self.remember_reply(&shared, &sent).await;
                self.record(channel, &request, &text);
            }
            Generation::TooLong(text) => {
                warn!(
                    channel = %channel,
                    chars = text.chars().count(),
                    limit = self.config.message_limit,
                    "reply too long, truncating"
                );
                let truncated = truncate_for_chat(&text, self.config.message_limit);
                let sent = self.deliver(channel, &truncated).await;
                self.remember_reply(&shared, &sent).await;
                self.record(channel, &request, &text);
            }
            Generation::Failed(e) => {
                warn!(channel = %channel, model = %request.model, error = %e, "generation failed");
                let sent = self.deliver(channel, APOLOGY).await;
                self.remember_reply(&shared, &sent).await;
            }
        }
    }

    /// Join a channel and add it to the joined list.
    pub async fn join_channel(&self, channel: ChannelName) -> Result<(), ChannelError> {
        self.chat.join(&channel).await?;
        let mut joined = self.joined.write().await;
        if !joined.contains(&channel) {
            info!(channel = %channel, "joined channel");
            joined.push(channel);
        }
        Ok(())
    }

    /// Leave a channel and forget everything about it.
    pub async fn part_channel(&self, channel: &ChannelName) {
        if let Err(e) = self.chat.part(channel).await {
            warn!(channel = %channel, error = %e, "part failed");
        }
        self.registry.remove(channel);
        self.joined.write().await.retain(|c| c != channel);
        info!(channel = %channel, "left channel");
    }

    fn new_state(&self, channel: &ChannelName) -> ChannelState {
        ChannelState::new(
            channel.clone(),
            ChannelDefaults {
                persona_prompt: self.config.persona_for(channel.as_str()),
                frequency: self.config.default_frequency,
                history_limit: self.config.default_history,
                model: self.roster.first().to_string(),
            },
        )
    }

    async fn run_command(&self, shared: &SharedState, msg: &InboundMessage, name: &str, args: &str) {
        let caller = Caller::resolve(&msg.author, msg.display(), msg.is_moderator, &self.config);
        let joined = self.joined_channels().await;

        let reply = {
            let mut state = shared.lock().await;
            let mut ctx = CommandContext {
                state: &mut *state,
                caller: &caller,
                args,
                bot: &self.config,
                roster: &self.roster,
                joined: &joined,
            };
            commands::dispatch(name, &mut ctx)
        };
        let Some(reply) = reply else {
            debug!(channel = %msg.channel, command = name, "unknown command ignored");
            return;
        };

        self.deliver(&msg.channel, &reply.text).await;
        match reply.effect {
            Some(Effect::Join(channel)) => {
                if let Err(e) = self.join_channel(channel.clone()).await {
                    warn!(channel = %channel, error = %e, "join failed");
                }
            }
            Some(Effect::Part(channel)) => self.part_channel(&channel).await,
            None => {}
        }
    }

    /// Send `text`, truncating and retrying once if the transport rejects it
    /// as too long. Returns the text that was handed to the transport last.
    async fn deliver(&self, channel: &ChannelName, text: &str) -> String {
        match self.chat.send(channel, text).await {
            Ok(()) => text.to_string(),
            Err(ChannelError::ContentTooLong { len, max }) => {
                warn!(channel = %channel, len, max, "transport rejected message length, retrying");
                let shorter = truncate_for_chat(text, max);
                if let Err(e) = self.chat.send(channel, &shorter).await {
                    warn!(channel = %channel, error = %e, "send failed after truncation");
                }
                shorter
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "send failed");
                text.to_string()
            }
        }
    }

    async fn remember_reply(&self, shared: &SharedState, text: &str) {
        shared.lock().await.push_line(&self.config.name, text);
    }

    fn record(&self, channel: &ChannelName, request: &GenerationRequest, response: &str) {
        let record = GenerationRecord::new(
            channel.as_str(),
            &request.model,
            &request.persona,
            request.params,
            response,
        );
        if let Err(e) = self.audit.append(&record) {
            warn!(channel = %channel, error = %e, "audit append failed");
        }
    }
}
