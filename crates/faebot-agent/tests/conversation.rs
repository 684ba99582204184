// End-to-end behaviour of the bot runtime against fake transport, provider
// and audit sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use faebot_agent::pipeline::{build_prompt, Tier, APOLOGY, TRUNCATION_MARKER};
use faebot_agent::{Bot, GenerationProvider, GenerationRequest, ModelRoster, ProviderError};
use faebot_audit::{AuditError, AuditLog, AuditSink, GenerationRecord, NEUTRAL_RATING};
use faebot_channels::{ChannelError, ChatChannel, InboundMessage};
use faebot_core::config::BotConfig;
use faebot_core::ChannelName;
use tokio::sync::{mpsc, Semaphore};

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    entered: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl FakeProvider {
    fn replying(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Every call blocks until a permit is added to `gate`.
    fn gated(replies: Vec<Result<String, ProviderError>>, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(replies)
        }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(req.clone());
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("default reply".to_string()))
    }
}

#[derive(Default)]
struct FakeChat {
    /// Successfully delivered messages.
    sent: Mutex<Vec<(ChannelName, String)>>,
    attempts: AtomicUsize,
    max_len: Option<usize>,
    joined: Mutex<Vec<ChannelName>>,
    parted: Mutex<Vec<ChannelName>>,
}

impl FakeChat {
    fn with_max_len(max: usize) -> Self {
        Self {
            max_len: Some(max),
            ..Self::default()
        }
    }

    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl ChatChannel for FakeChat {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send(&self, channel: &ChannelName, text: &str) -> Result<(), ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let len = text.chars().count();
        if let Some(max) = self.max_len {
            if len > max {
                return Err(ChannelError::ContentTooLong { len, max });
            }
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn join(&self, channel: &ChannelName) -> Result<(), ChannelError> {
        self.joined.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn part(&self, channel: &ChannelName) -> Result<(), ChannelError> {
        self.parted.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn listen(&self, _tx: mpsc::Sender<InboundMessage>) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[derive(Default)]
struct MemorySink {
    records: Mutex<Vec<GenerationRecord>>,
}

impl MemorySink {
    fn records(&self) -> Vec<GenerationRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for MemorySink {
    fn append(&self, record: &GenerationRecord) -> Result<(), AuditError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Harness {
    bot: Arc<Bot>,
    provider: Arc<FakeProvider>,
    chat: Arc<FakeChat>,
    sink: Arc<MemorySink>,
}

fn harness(provider: FakeProvider, chat: FakeChat, frequency: u32, history: usize) -> Harness {
    let config = BotConfig {
        admins: vec!["Fae".into()],
        default_frequency: frequency,
        default_history: history,
        ..BotConfig::default()
    };
    let roster = ModelRoster::new(vec!["A".into(), "B".into()]).unwrap();
    let provider = Arc::new(provider);
    let chat = Arc::new(chat);
    let sink = Arc::new(MemorySink::default());
    let bot = Bot::new(
        config,
        roster,
        provider.clone(),
        chat.clone(),
        sink.clone(),
    )
    .with_channels(vec!["chan".into()]);
    Harness {
        bot: Arc::new(bot),
        provider,
        chat,
        sink,
    }
}

fn chan() -> ChannelName {
    ChannelName::new("chan")
}

fn viewer(text: &str) -> InboundMessage {
    InboundMessage::new("#chan", "viewer", text)
}

fn moderator(text: &str) -> InboundMessage {
    InboundMessage::new("#chan", "modsquad", text).with_moderator(true)
}

fn admin(text: &str) -> InboundMessage {
    InboundMessage::new("#chan", "fae", text)
}

async fn transcript(bot: &Bot) -> Vec<String> {
    let state = bot.registry().get(&chan()).expect("channel state");
    let lines = state.lock().await.transcript().to_vec();
    lines
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn quiet_messages_accumulate_then_trim_on_assembly() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 0, 5);

    for i in 0..7 {
        assert!(h.bot.handle(viewer(&format!("message {i}"))).await.is_none());
    }
    assert_eq!(transcript(&h.bot).await.len(), 7);
    assert!(h.provider.requests().is_empty());

    let state = h.bot.registry().get(&chan()).unwrap();
    let mut state = state.lock().await;
    let prompt = build_prompt(&mut state, "faebot");
    assert_eq!(state.transcript().len(), 5);
    assert_eq!(state.transcript()[0], "viewer: message 2");
    assert!(prompt.prompt.ends_with("viewer: message 6\nfaebot:"));
}

#[tokio::test]
async fn mention_generates_sends_and_records() {
    let h = harness(
        FakeProvider::replying(vec![Ok(" hi viewer! ".into())]),
        FakeChat::default(),
        0,
        20,
    );

    let task = h.bot.handle(viewer("hey faebot")).await.expect("generation");
    task.await.unwrap();

    assert_eq!(h.chat.texts(), ["hi viewer!"]);
    assert_eq!(
        transcript(&h.bot).await,
        ["viewer: hey faebot", "faebot: hi viewer!"]
    );

    let req = &h.provider.requests()[0];
    assert_eq!(req.model, "A");
    assert_eq!(req.prompt, "viewer: hey faebot\nfaebot:");
    assert!(req.persona.contains("chan"));

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, "chan");
    assert_eq!(records[0].response, "hi viewer!");
    assert_eq!(records[0].params, req.params);
    assert_eq!(records[0].rating, NEUTRAL_RATING);
}

#[tokio::test]
async fn invented_turns_never_reach_the_transcript() {
    let h = harness(
        FakeProvider::replying(vec![
            Ok("sure!\nviewer: I love faebot\nfaebot: thanks".into()),
            Ok("ok".into()),
        ]),
        FakeChat::default(),
        0,
        2,
    );

    h.bot.handle(viewer("hey faebot")).await.unwrap().await.unwrap();

    assert_eq!(h.chat.texts(), ["sure!"]);
    assert_eq!(
        transcript(&h.bot).await,
        ["viewer: hey faebot", "faebot: sure!"]
    );
    assert_eq!(h.sink.records()[0].response, "sure!");

    h.bot.handle(viewer("faebot again")).await.unwrap().await.unwrap();
    let req = &h.provider.requests()[1];
    assert_eq!(req.prompt, "faebot: sure!\nviewer: faebot again\nfaebot:");
}

#[tokio::test]
async fn frequency_one_always_replies() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 1, 20);
    for text in ["one", "two", "three"] {
        let task = h.bot.handle(viewer(text)).await.expect("generation");
        task.await.unwrap();
    }
    assert_eq!(h.chat.texts().len(), 3);
}

#[tokio::test]
async fn oversize_output_is_truncated_with_marker() {
    let h = harness(
        FakeProvider::replying(vec![Ok("a".repeat(1000))]),
        FakeChat::default(),
        0,
        20,
    );

    h.bot.handle(viewer("faebot say a lot")).await.unwrap().await.unwrap();

    let sent = h.chat.texts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chars().count(), 500);
    assert!(sent[0].ends_with(TRUNCATION_MARKER));

    let last = transcript(&h.bot).await.pop().unwrap();
    assert_eq!(last, format!("faebot: {}", sent[0]));

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].response.len(), 1000);
}

#[tokio::test]
async fn transport_length_rejection_retries_once_truncated() {
    let h = harness(
        FakeProvider::replying(vec![Ok("b".repeat(300))]),
        FakeChat::with_max_len(100),
        0,
        20,
    );

    h.bot.handle(viewer("faebot?")).await.unwrap().await.unwrap();

    assert_eq!(h.chat.attempts.load(Ordering::SeqCst), 2);
    let sent = h.chat.texts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chars().count(), 100);
    assert!(sent[0].ends_with(TRUNCATION_MARKER));
    assert_eq!(
        transcript(&h.bot).await.pop().unwrap(),
        format!("faebot: {}", sent[0])
    );
}

#[tokio::test]
async fn provider_failure_sends_apology_without_record() {
    let h = harness(
        FakeProvider::replying(vec![Err(ProviderError::Timeout { secs: 120 })]),
        FakeChat::default(),
        0,
        20,
    );

    h.bot.handle(viewer("faebot hello")).await.unwrap().await.unwrap();

    assert_eq!(h.chat.texts(), [APOLOGY]);
    assert_eq!(
        transcript(&h.bot).await.pop().unwrap(),
        format!("faebot: {APOLOGY}")
    );
    assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn silenced_channel_ignores_mentions() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 1, 20);

    h.bot.handle(moderator("!silence on")).await;
    assert!(h.bot.handle(viewer("faebot are you there")).await.is_none());
    assert!(h.provider.requests().is_empty());
    // only the command reply went out
    assert_eq!(h.chat.texts().len(), 1);

    h.bot.handle(moderator("!silence off")).await;
    assert!(h.bot.handle(viewer("faebot?")).await.is_some());
}

#[tokio::test]
async fn freq_command_respects_permissions() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 5, 20);

    h.bot.handle(viewer("!freq 3")).await;
    assert_eq!(h.chat.texts().pop().unwrap(), Tier::Moderator.refusal());

    h.bot.handle(moderator("!freq 3")).await;
    h.bot.handle(moderator("!freq")).await;
    assert_eq!(h.chat.texts().pop().unwrap(), "current frequency is 3");

    let state = h.bot.registry().get(&chan()).unwrap();
    assert_eq!(state.lock().await.frequency, 3);
}

#[tokio::test]
async fn commands_and_echoes_stay_out_of_transcript() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 0, 20);

    assert!(h
        .bot
        .handle(InboundMessage::new("#chan", "faebot", "faebot echo").with_echo(true))
        .await
        .is_none());
    assert!(h.bot.registry().is_empty());

    h.bot.handle(viewer("!hello")).await;
    h.bot.handle(viewer("!nonsense")).await;
    assert!(transcript(&h.bot).await.is_empty());
    assert_eq!(h.chat.texts(), ["Hello viewer!"]);
}

#[tokio::test]
async fn switch_changes_model_used_for_generation() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 0, 20);

    h.bot.handle(moderator("!switch")).await;
    h.bot.handle(viewer("faebot hi")).await.unwrap().await.unwrap();
    assert_eq!(h.provider.requests()[0].model, "B");

    h.bot.handle(moderator("!switch")).await;
    let state = h.bot.registry().get(&chan()).unwrap();
    assert_eq!(state.lock().await.current_model, "A");
}

#[tokio::test]
async fn admin_join_adds_channel() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 0, 20);

    h.bot.handle(moderator("!join elsewhere")).await;
    assert!(h.chat.joined.lock().unwrap().is_empty());

    h.bot.handle(admin("!join #Elsewhere")).await;
    assert_eq!(*h.chat.joined.lock().unwrap(), [ChannelName::new("elsewhere")]);
    assert_eq!(
        h.bot.joined_channels().await,
        [chan(), ChannelName::new("elsewhere")]
    );

    h.bot.handle(admin("!join")).await;
    assert_eq!(h.chat.texts().pop().unwrap(), "I'm in: chan, elsewhere");
}

#[tokio::test]
async fn part_during_generation_drops_the_reply() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        FakeProvider::gated(vec![Ok("too late".into())], gate.clone()),
        FakeChat::default(),
        0,
        20,
    );

    let task = h.bot.handle(viewer("faebot think hard")).await.unwrap();
    let provider = h.provider.clone();
    wait_until(|| provider.entered.load(Ordering::SeqCst) == 1).await;

    h.bot.handle(moderator("!part")).await;
    assert!(h.bot.registry().get(&chan()).is_none());
    assert_eq!(*h.chat.parted.lock().unwrap(), [chan()]);
    assert!(h.bot.joined_channels().await.is_empty());

    gate.add_permits(1);
    task.await.unwrap();

    assert_eq!(h.chat.texts(), ["bye bye chan! 👋"]);
    assert!(h.sink.records().is_empty());
}

#[tokio::test]
async fn generations_for_one_channel_may_overlap() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        FakeProvider::gated(vec![Ok("first".into()), Ok("second".into())], gate.clone()),
        FakeChat::default(),
        1,
        20,
    );

    let a = h.bot.handle(viewer("one")).await.unwrap();
    let b = h.bot.handle(viewer("two")).await.unwrap();

    let provider = h.provider.clone();
    wait_until(|| provider.entered.load(Ordering::SeqCst) == 2).await;

    gate.add_permits(2);
    a.await.unwrap();
    b.await.unwrap();

    let mut sent = h.chat.texts();
    sent.sort();
    assert_eq!(sent, ["first", "second"]);
    assert_eq!(h.sink.records().len(), 2);
    assert_eq!(transcript(&h.bot).await.len(), 4);
}

#[tokio::test]
async fn ingestion_loop_processes_in_order() {
    let h = harness(FakeProvider::default(), FakeChat::default(), 0, 20);
    let (tx, rx) = mpsc::channel(16);

    for i in 0..5 {
        tx.send(viewer(&format!("line {i}"))).await.unwrap();
    }
    drop(tx);
    h.bot.clone().run(rx).await;

    let lines = transcript(&h.bot).await;
    let expected: Vec<String> = (0..5).map(|i| format!("viewer: line {i}")).collect();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn sqlite_audit_log_receives_records() {
    let audit = Arc::new(AuditLog::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap());
    let chat = Arc::new(FakeChat::default());
    let bot = Arc::new(Bot::new(
        BotConfig::default(),
        ModelRoster::new(vec!["meta/llama-2-7b-chat".into()]).unwrap(),
        Arc::new(FakeProvider::replying(vec![Ok("stored".into())])),
        chat.clone(),
        audit.clone(),
    ));

    bot.handle(viewer("faebot remember this")).await.unwrap().await.unwrap();

    let rows = audit.recent("chan", 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].response, "stored");
    assert_eq!(rows[0].model, "meta/llama-2-7b-chat");
}
