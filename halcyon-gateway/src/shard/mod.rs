pub mod command;
pub mod error;
pub mod heartbeat;
pub mod inflater;
pub mod session;
pub mod state;

pub use self::{
    error::{ConnectingError, ConnectingErrorType, ProcessError, ProcessErrorType, ReceivingEventError, ReceivingEventErrorType},
    heartbeat::Latency,
    session::Session,
    state::ShardState,
};

use self::{
    heartbeat::{Heartbeater, Heartbeats},
    inflater::Inflater,
};
use futures_channel::mpsc;
use futures_util::{SinkExt, StreamExt};
use halcyon_gateway_queue::IdentifyGate;
use halcyon_model::{
    gateway::{payload::{Hello, ReadyMinimal}, CloseCode, OpCode},
    Intents,
};
use rand::Rng;
use serde::Deserialize;
use std::{
    sync::{atomic::AtomicU64, Arc},
    time::Duration,
};
use tokio::{sync::Notify, time::sleep};
use tokio_tungstenite::tungstenite::{
    protocol::{frame::coding::CloseCode as TungsteniteCloseCode, CloseFrame},
    Message,
};
use tokio_util::sync::CancellationToken;

/// Configuration for one [`Shard`].
#[derive(Clone, Debug)]
pub struct ShardConfig {
    pub id: u64,
    pub total: u64,
    pub token: String,
    pub intents: Intents,
    pub compression: bool,
    pub gateway_url: String,
}

/// A raw dispatch forwarded from a shard's read loop to the dispatcher: the
/// owning shard, the event name, and the still-unparsed payload bytes.
pub struct RawDispatch {
    pub shard_id: u64,
    pub event_name: String,
    pub data: Box<serde_json::value::RawValue>,
}

/// A single persistent gateway session.
///
/// Owns its own read loop, heartbeat loop, and single-writer outbound
/// queue; reconnects and resumes indefinitely until `cancel` fires or a
/// fatal close code is received.
pub struct Shard {
    config: ShardConfig,
    identify_gate: Arc<dyn IdentifyGate>,
    dispatch_tx: mpsc::UnboundedSender<RawDispatch>,
    cancel: CancellationToken,
    session: tokio::sync::Mutex<Option<Arc<Session>>>,
    seq: Arc<AtomicU64>,
}

enum Outcome {
    /// The connection ended in a way that should be retried with a Resume.
    Resume,
    /// The connection ended in a way that requires a fresh Identify.
    Reidentify,
}

impl Shard {
    pub fn new(
        config: ShardConfig,
        identify_gate: Arc<dyn IdentifyGate>,
        dispatch_tx: mpsc::UnboundedSender<RawDispatch>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            identify_gate,
            dispatch_tx,
            cancel,
            session: tokio::sync::Mutex::new(None),
            seq: Arc::new(AtomicU64::new(0)),
        })
    }

    pub const fn id(&self) -> u64 {
        self.config.id
    }

    pub async fn latency(&self) -> Option<Latency> {
        None
    }

    pub async fn state(&self) -> ShardState {
        match &*self.session.lock().await {
            Some(session) => session.state(),
            None => ShardState::Disconnected,
        }
    }

    /// Runs the shard until cancellation or a fatal error, reconnecting
    /// and resuming/re-identifying across transient failures with
    /// exponential backoff and full jitter.
    pub async fn run(self: Arc<Self>) -> Result<(), ReceivingEventError> {
        let mut backoff = Backoff::new();

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            match self.connect_and_process().await {
                Ok(Outcome::Resume) => {
                    backoff.reset();
                }
                Ok(Outcome::Reidentify) => {
                    self.clear_session().await;
                    let jitter = rand::thread_rng().gen_range(1.0..5.0);
                    sleep(Duration::from_secs_f64(jitter)).await;
                    backoff.reset();
                }
                Err(err) => return Err(err),
            }

            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let wait = backoff.next();
            tracing::debug!(shard_id = self.config.id, millis = %wait.as_millis(), "backing off before reconnecting");
            sleep(wait).await;
        }
    }

    async fn clear_session(&self) {
        if let Some(session) = &*self.session.lock().await {
            session.clear_id();
        }

        self.seq.store(0, std::sync::atomic::Ordering::Release);
    }

    async fn connect_and_process(self: &Arc<Self>) -> Result<Outcome, ReceivingEventError> {
        let url = if self.config.compression {
            format!("{}?v=10&encoding=json&compress=zlib-stream", self.config.gateway_url)
        } else {
            format!("{}?v=10&encoding=json", self.config.gateway_url)
        };

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&url).await.map_err(|source| {
            ReceivingEventError {
                kind: ReceivingEventErrorType::Reconnect,
                source: Some(Box::new(source)),
            }
        })?;

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded();
        let writer = tokio::spawn(async move {
            while let Some(message) = rx.next().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
        });

        let previous_id = match &*self.session.lock().await {
            Some(previous) => previous.id(),
            None => None,
        };

        let session = Arc::new(Session::new(tx));

        if let Some(id) = previous_id {
            session.set_id(id);
        }

        session.set_seq(self.seq.load(std::sync::atomic::Ordering::Relaxed));
        *self.session.lock().await = Some(Arc::clone(&session));
        session.set_state(ShardState::Connecting);

        let heartbeats = Arc::new(Heartbeats::default());
        let mut heartbeater_handle: Option<tokio::task::JoinHandle<()>> = None;
        let mut inflater = self.config.compression.then(|| Inflater::new(self.config.id));
        let heartbeat_failed = Arc::new(Notify::new());

        let outcome = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = session.close(Some(CloseFrame {
                        code: TungsteniteCloseCode::Normal,
                        reason: "client shutdown".into(),
                    }));
                    break Ok(Outcome::Resume);
                }
                _ = heartbeat_failed.notified() => {
                    tracing::warn!(shard_id = self.config.id, "heartbeat ack timed out, reconnecting");
                    let _ = session.close(Some(CloseFrame {
                        code: TungsteniteCloseCode::Library(4000),
                        reason: "heartbeat ack timed out".into(),
                    }));
                    break Ok(Outcome::Resume);
                }
                message = read.next() => {
                    match message {
                        Some(Ok(message)) => {
                            match self
                                .handle_message(message, &session, &heartbeats, &mut heartbeater_handle, &mut inflater, &heartbeat_failed)
                                .await
                            {
                                Ok(None) => continue,
                                Ok(Some(outcome)) => break Ok(outcome),
                                Err(err) => break Err(err),
                            }
                        }
                        Some(Err(_)) | None => break Ok(Outcome::Resume),
                    }
                }
            }
        };

        if let Some(handle) = heartbeater_handle.take() {
            handle.abort();
        }
        writer.abort();

        outcome
    }

    async fn handle_message(
        self: &Arc<Self>,
        message: Message,
        session: &Arc<Session>,
        heartbeats: &Arc<Heartbeats>,
        heartbeater_handle: &mut Option<tokio::task::JoinHandle<()>>,
        inflater: &mut Option<Inflater>,
        heartbeat_failed: &Arc<Notify>,
    ) -> Result<Option<Outcome>, ReceivingEventError> {
        let bytes: Vec<u8> = match message {
            Message::Binary(bytes) => {
                if let Some(inflater) = inflater {
                    inflater.extend(&bytes);

                    match inflater.message() {
                        Ok(Some(buffer)) => buffer.to_vec(),
                        Ok(None) => return Ok(None),
                        Err(_) => return Ok(Some(Outcome::Resume)),
                    }
                } else {
                    bytes
                }
            }
            Message::Text(text) => text.into_bytes(),
            Message::Close(frame) => {
                let code = frame.as_ref().map_or(1000, |f| u16::from(f.code));
                return Ok(Some(self.handle_close(code)?));
            }
            _ => return Ok(None),
        };

        self.handle_payload(&bytes, session, heartbeats, heartbeater_handle, heartbeat_failed).await
    }

    fn handle_close(&self, code: u16) -> Result<Outcome, ReceivingEventError> {
        let close_code = CloseCode::from_u16(code);

        tracing::info!(shard_id = self.config.id, code, "shard closed");

        if close_code.is_resumable() {
            Ok(Outcome::Resume)
        } else {
            Err(ReceivingEventError {
                kind: ReceivingEventErrorType::ClosedFatally {
                    shard_id: self.config.id,
                    close_code: code,
                },
                source: None,
            })
        }
    }

    async fn handle_payload(
        self: &Arc<Self>,
        bytes: &[u8],
        session: &Arc<Session>,
        heartbeats: &Arc<Heartbeats>,
        heartbeater_handle: &mut Option<tokio::task::JoinHandle<()>>,
        heartbeat_failed: &Arc<Notify>,
    ) -> Result<Option<Outcome>, ReceivingEventError> {
        #[derive(Deserialize)]
        struct Envelope<'a> {
            op: u8,
            #[serde(borrow)]
            d: Option<&'a serde_json::value::RawValue>,
            s: Option<u64>,
            t: Option<String>,
        }

        let envelope: Envelope<'_> = match serde_json::from_slice(bytes) {
            Ok(envelope) => envelope,
            Err(_) => {
                tracing::warn!(shard_id = self.config.id, "dropping unparseable gateway payload");
                return Ok(None);
            }
        };

        let Some(opcode) = OpCode::from_u8(envelope.op) else {
            return Ok(None);
        };

        if let Some(seq) = envelope.s {
            session.set_seq(seq);
            self.seq.store(seq, std::sync::atomic::Ordering::Release);
        }

        match opcode {
            OpCode::Hello => {
                if let Some(data) = envelope.d {
                    if let Ok(hello) = serde_json::from_str::<Hello>(data.get()) {
                        self.start_session(session, heartbeats, heartbeater_handle, hello.heartbeat_interval, heartbeat_failed)
                            .await;
                    }
                }

                Ok(None)
            }
            OpCode::HeartbeatAck => {
                heartbeats.receive().await;
                Ok(None)
            }
            OpCode::Heartbeat => {
                let _ = session.send(halcyon_model::gateway::payload::OutboundPayload::new(
                    OpCode::Heartbeat,
                    (session.seq() != 0).then(|| session.seq()),
                ));
                Ok(None)
            }
            OpCode::Reconnect => {
                let _ = session.close(Some(CloseFrame {
                    code: TungsteniteCloseCode::Library(4000),
                    reason: "reconnecting".into(),
                }));
                Ok(Some(Outcome::Resume))
            }
            OpCode::InvalidSession => {
                let resumable = envelope
                    .d
                    .and_then(|d| serde_json::from_str::<bool>(d.get()).ok())
                    .unwrap_or(false);

                Ok(Some(if resumable { Outcome::Resume } else { Outcome::Reidentify }))
            }
            OpCode::Dispatch => {
                let (Some(event_name), Some(data)) = (envelope.t, envelope.d) else {
                    return Ok(None);
                };

                if event_name == "READY" {
                    if let Ok(ready) = serde_json::from_str::<ReadyMinimal>(data.get()) {
                        session.set_id(ready.session_id.into_boxed_str());
                        session.set_state(ShardState::Ready);
                    }
                } else if event_name == "RESUMED" {
                    session.set_state(ShardState::Ready);
                }

                let _ = self.dispatch_tx.unbounded_send(RawDispatch {
                    shard_id: self.config.id,
                    event_name,
                    data: data.to_owned(),
                });

                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn start_session(
        self: &Arc<Self>,
        session: &Arc<Session>,
        heartbeats: &Arc<Heartbeats>,
        heartbeater_handle: &mut Option<tokio::task::JoinHandle<()>>,
        heartbeat_interval: u64,
        heartbeat_failed: &Arc<Notify>,
    ) {
        if session.state() == ShardState::Resuming || session.id().is_some() {
            session.set_state(ShardState::Resuming);

            if let Some(session_id) = session.id() {
                let _ = session.send(command::resume(&self.config.token, &session_id, session.seq()));
            }
        } else {
            session.set_state(ShardState::Identifying);
            self.identify_gate.acquire(self.config.id).await;
            let _ = session.send(command::identify(&self.config.token, self.config.intents, self.config.id, self.config.total));
        }

        let heartbeater = Heartbeater::new(
            Arc::clone(heartbeats),
            heartbeat_interval,
            Arc::clone(&self.seq),
            session.sender(),
            Arc::clone(heartbeat_failed),
        );

        let handle = tokio::spawn(heartbeater.run());

        if let Some(old) = heartbeater_handle.replace(handle) {
            old.abort();
        }
    }
}

/// Exponential backoff with full jitter, bounded to the gateway's
/// reconnect policy: 1s initial, doubling up to a 60s ceiling.
struct Backoff {
    attempt: u32,
}

impl Backoff {
    const MIN: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(60);

    fn new() -> Self {
        Self { attempt: 0 }
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next(&mut self) -> Duration {
        let exp = Self::MIN.as_millis() as u64 * 2u64.saturating_pow(self.attempt);
        let capped = exp.min(Self::MAX.as_millis() as u64);
        self.attempt = self.attempt.saturating_add(1);

        let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
        Duration::from_millis(jittered)
    }
}
