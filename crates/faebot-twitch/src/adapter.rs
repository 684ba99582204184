use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use faebot_channels::{ChannelError, ChatChannel, InboundMessage};
use faebot_core::config::FaebotConfig;
use faebot_core::ChannelName;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_rustls::client::TlsStream;
use tracing::{debug, info, warn};

use crate::irc::IrcMessage;
use crate::send::{prepare_outgoing, strip_action};

/// Twitch PINGs roughly every five minutes; silence past this means the
/// connection is dead.
const READ_TIMEOUT: Duration = Duration::from_secs(360);

type WriteHalf = tokio::io::WriteHalf<TlsStream<TcpStream>>;

/// Twitch chat over IRC-over-TLS.
///
/// `listen` owns one connection for its whole lifetime; `send`, `join` and
/// `part` write through the shared write half while it is connected. The
/// channel list survives reconnects and is re-joined after every welcome.
pub struct TwitchChannel {
    server: String,
    port: u16,
    nick: String,
    token: String,
    max_len: usize,
    channels: Mutex<Vec<ChannelName>>,
    writer: Arc<Mutex<Option<WriteHalf>>>,
}

impl TwitchChannel {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        nick: &str,
        token: &str,
        channels: Vec<ChannelName>,
        max_len: usize,
    ) -> Self {
        let token = token.trim();
        let token = if token.starts_with("oauth:") {
            token.to_string()
        } else {
            format!("oauth:{token}")
        };
        Self {
            server: server.into(),
            port,
            nick: nick.to_ascii_lowercase(),
            token,
            max_len,
            channels: Mutex::new(channels),
            writer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &FaebotConfig) -> Result<Self, ChannelError> {
        let token = config
            .twitch
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ChannelError::ConfigError("no Twitch token configured".into()))?;
        let channels = config
            .twitch
            .channels
            .iter()
            .map(|c| ChannelName::new(c))
            .filter(|c| !c.is_empty())
            .collect();
        Ok(Self::new(
            config.twitch.server.clone(),
            config.twitch.port,
            &config.nick(),
            token,
            channels,
            config.bot.message_limit,
        ))
    }

    pub async fn channels(&self) -> Vec<ChannelName> {
        self.channels.lock().await.clone()
    }

    async fn connect(&self) -> Result<TlsStream<TcpStream>, ChannelError> {
        let addr = format!("{}:{}", self.server, self.port);
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("{addr}: {e}")))?;

        let root_store: rustls::RootCertStore =
            webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
        let tls_config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));
        let domain = rustls::pki_types::ServerName::try_from(self.server.clone())
            .map_err(|e| ChannelError::ConfigError(format!("bad server name: {e}")))?;
        connector
            .connect(domain, tcp)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("TLS handshake: {e}")))
    }

    /// Send a raw IRC line (appends \r\n).
    async fn send_raw(writer: &mut WriteHalf, line: &str) -> Result<(), ChannelError> {
        let data = format!("{line}\r\n");
        writer.write_all(data.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Write through the shared half. `Ok(false)` when not connected.
    async fn write_line(&self, line: &str) -> Result<bool, ChannelError> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(w) => Self::send_raw(w, line).await.map(|()| true),
            None => Ok(false),
        }
    }

    async fn session(&self, tx: mpsc::Sender<InboundMessage>) -> Result<(), ChannelError> {
        info!(server = %self.server, port = self.port, nick = %self.nick, "connecting to Twitch chat");

        let tls = self.connect().await?;
        let (reader, mut writer) = tokio::io::split(tls);

        Self::send_raw(&mut writer, "CAP REQ :twitch.tv/tags twitch.tv/commands").await?;
        Self::send_raw(&mut writer, &format!("PASS {}", self.token)).await?;
        Self::send_raw(&mut writer, &format!("NICK {}", self.nick)).await?;
        *self.writer.lock().await = Some(writer);

        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            let n = tokio::time::timeout(READ_TIMEOUT, reader.read_line(&mut line))
                .await
                .map_err(|_| ChannelError::Timeout {
                    ms: READ_TIMEOUT.as_millis() as u64,
                })??;
            if n == 0 {
                return Err(ChannelError::Disconnected("closed by server".into()));
            }

            let Some(msg) = IrcMessage::parse(&line) else {
                continue;
            };

            match msg.command.as_str() {
                "PING" => {
                    let token = msg.params.first().map_or("tmi.twitch.tv", String::as_str);
                    self.write_line(&format!("PONG :{token}")).await?;
                }

                // RPL_WELCOME: registration complete
                "001" => {
                    let channels = self.channels().await;
                    info!(nick = %self.nick, channels = channels.len(), "registered with Twitch chat");
                    for channel in &channels {
                        self.write_line(&format!("JOIN {}", channel.irc())).await?;
                    }
                }

                "NOTICE" => {
                    let text = msg.params.last().map_or("", String::as_str);
                    if text.contains("Login authentication failed")
                        || text.contains("Improperly formatted auth")
                    {
                        return Err(ChannelError::AuthFailed(text.to_string()));
                    }
                    debug!(notice = %text, "Twitch notice");
                }

                "RECONNECT" => {
                    return Err(ChannelError::Disconnected("server requested reconnect".into()));
                }

                "PRIVMSG" => {
                    let Some(inbound) = to_inbound(&msg, &self.nick) else {
                        continue;
                    };
                    if tx.send(inbound).await.is_err() {
                        return Ok(());
                    }
                }

                _ => {}
            }
        }
    }
}

/// Map a tagged PRIVMSG to an [`InboundMessage`]. Whispers and malformed
/// lines yield `None`.
fn to_inbound(msg: &IrcMessage, own_nick: &str) -> Option<InboundMessage> {
    let target = msg.params.first()?;
    if !target.starts_with('#') {
        return None;
    }
    let text = strip_action(msg.params.get(1)?);
    let author = msg.nick()?.to_ascii_lowercase();

    let is_broadcaster = msg
        .tag("badges")
        .is_some_and(|b| b.split(',').any(|badge| badge.starts_with("broadcaster/")));
    let is_moderator = msg.tag("mod") == Some("1") || is_broadcaster;

    let mut inbound = InboundMessage::new(target.as_str(), &author, text)
        .with_moderator(is_moderator)
        .with_echo(author == own_nick);
    if let Some(display) = msg.tag("display-name") {
        inbound = inbound.with_display_name(display);
    }
    Some(inbound)
}

#[async_trait]
impl ChatChannel for TwitchChannel {
    fn name(&self) -> &str {
        "twitch"
    }

    async fn send(&self, channel: &ChannelName, text: &str) -> Result<(), ChannelError> {
        let line = prepare_outgoing(text, self.max_len)?;
        if line.is_empty() {
            return Ok(());
        }
        if self
            .write_line(&format!("PRIVMSG {} :{line}", channel.irc()))
            .await?
        {
            Ok(())
        } else {
            Err(ChannelError::SendFailed("not connected to Twitch chat".into()))
        }
    }

    async fn join(&self, channel: &ChannelName) -> Result<(), ChannelError> {
        {
            let mut channels = self.channels.lock().await;
            if !channels.contains(channel) {
                channels.push(channel.clone());
            }
        }
        // joined on the next welcome if currently disconnected
        self.write_line(&format!("JOIN {}", channel.irc())).await?;
        Ok(())
    }

    async fn part(&self, channel: &ChannelName) -> Result<(), ChannelError> {
        self.channels.lock().await.retain(|c| c != channel);
        self.write_line(&format!("PART {}", channel.irc())).await?;
        Ok(())
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> Result<(), ChannelError> {
        let result = self.session(tx).await;
        *self.writer.lock().await = None;
        if let Err(e) = &result {
            warn!(error = %e, "Twitch chat session ended");
        }
        result
    }
}
