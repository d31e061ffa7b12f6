use super::state::ShardState;
use futures_channel::mpsc::{TrySendError, UnboundedSender};
use serde::Serialize;
use std::{
    convert::TryFrom,
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Mutex as SyncMutex,
    },
};
use tokio_tungstenite::tungstenite::{protocol::CloseFrame, Message};

#[derive(Debug)]
pub enum SessionSendError {
    Sending { source: TrySendError<Message> },
    Serializing { source: serde_json::Error },
}

impl Display for SessionSendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Serializing { source } => Display::fmt(source, f),
            Self::Sending { source } => Display::fmt(source, f),
        }
    }
}

impl Error for SessionSendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sending { source } => Some(source),
            Self::Serializing { source } => Some(source),
        }
    }
}

/// Per-connection session state: the sequence number, session ID, and
/// current stage, plus the single-writer outbound queue every frame must
/// go through.
#[derive(Debug)]
pub struct Session {
    id: SyncMutex<Option<Box<str>>>,
    seq: AtomicU64,
    stage: AtomicU8,
    tx: UnboundedSender<Message>,
}

impl Session {
    pub fn new(tx: UnboundedSender<Message>) -> Self {
        Self {
            id: SyncMutex::new(None),
            seq: AtomicU64::new(0),
            stage: AtomicU8::new(ShardState::default() as u8),
            tx,
        }
    }

    /// Serializes and enqueues a payload onto the single outbound writer.
    pub fn send(&self, payload: impl Serialize) -> Result<(), SessionSendError> {
        let bytes = serde_json::to_vec(&payload).map_err(|source| SessionSendError::Serializing { source })?;

        self.tx
            .unbounded_send(Message::Binary(bytes))
            .map_err(|source| SessionSendError::Sending { source })?;

        Ok(())
    }

    pub fn close(&self, frame: Option<CloseFrame<'static>>) -> Result<(), TrySendError<Message>> {
        self.tx.unbounded_send(Message::Close(frame))
    }

    /// Returns a clone of the outbound writer handle, for components (like
    /// the heartbeater) that need to enqueue frames directly.
    pub fn sender(&self) -> UnboundedSender<Message> {
        self.tx.clone()
    }

    pub fn seq(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    pub fn set_seq(&self, seq: u64) {
        self.seq.store(seq, Ordering::Release);
    }

    pub fn state(&self) -> ShardState {
        ShardState::try_from(self.stage.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_state(&self, state: ShardState) {
        self.stage.store(state as u8, Ordering::Release);
    }

    pub fn id(&self) -> Option<Box<str>> {
        self.id.lock().expect("session id poisoned").clone()
    }

    pub fn set_id(&self, id: Box<str>) {
        self.id.lock().expect("session id poisoned").replace(id);
    }

    pub fn clear_id(&self) {
        self.id.lock().expect("session id poisoned").take();
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::shard::state::ShardState;
    use futures_channel::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    #[test]
    fn send_enqueues_a_serialized_binary_frame() {
        let (tx, mut rx) = mpsc::unbounded();
        let session = Session::new(tx);

        session.send(serde_json::json!({"op": 1})).unwrap();

        match rx.try_next().unwrap().unwrap() {
            Message::Binary(bytes) => assert_eq!(bytes, br#"{"op":1}"#),
            other => panic!("expected a binary frame, got {other:?}"),
        }
    }

    #[test]
    fn id_round_trips_through_set_and_clear() {
        let (tx, _rx) = mpsc::unbounded();
        let session = Session::new(tx);

        assert!(session.id().is_none());

        session.set_id("abc".into());
        assert_eq!(session.id().as_deref(), Some("abc"));

        session.clear_id();
        assert!(session.id().is_none());
    }

    #[test]
    fn state_defaults_to_disconnected_and_round_trips() {
        let (tx, _rx) = mpsc::unbounded();
        let session = Session::new(tx);

        assert_eq!(session.state(), ShardState::Disconnected);

        session.set_state(ShardState::Ready);
        assert_eq!(session.state(), ShardState::Ready);
    }
}
