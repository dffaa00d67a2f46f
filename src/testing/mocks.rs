//! Mock session implementations for testing.
//!
//! `MockSession` records everything an adapter hands to it and can be told to
//! fail connects or publishes; `MockSessionFactory` scripts which session the
//! next adapter construction receives and keeps a handle to every session it
//! created, in creation order.

use crate::session::{
    DisconnectReason, MqttSession, PublishAck, SessionAuth, SessionError, SessionFactory,
    SessionOptions,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type PublishedMessage = (String, Vec<u8>);

#[derive(Clone, Default)]
struct SharedState {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    auth_history: Arc<Mutex<Vec<SessionAuth>>>,
    options: Arc<Mutex<Option<SessionOptions>>>,
    connect_calls: Arc<AtomicUsize>,
    fail_connect: Arc<AtomicBool>,
    fail_publish: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

/// Inspection handle onto one mock session, usable after the session has been
/// boxed away into an adapter.
#[derive(Clone)]
pub struct MockSessionHandle {
    state: SharedState,
    disconnects: mpsc::Sender<DisconnectReason>,
}

impl MockSessionHandle {
    /// Messages the adapter handed to this session, in publish order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.published.lock().unwrap().clone()
    }

    /// Authentication material from every connect/reconnect, in order.
    pub fn auth_history(&self) -> Vec<SessionAuth> {
        self.state.auth_history.lock().unwrap().clone()
    }

    /// Connection coordinates the factory created this session with.
    pub fn options(&self) -> Option<SessionOptions> {
        self.state.options.lock().unwrap().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// Make subsequent publishes fail at the session level.
    pub fn fail_publishes(&self, fail: bool) {
        self.state.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent connects/reconnects fail.
    pub fn fail_connects(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Deliver a disconnect event as the broker would.
    pub async fn emit_disconnect(&self, reason: DisconnectReason) {
        self.state.connected.store(false, Ordering::SeqCst);
        let _ = self.disconnects.send(reason).await;
    }
}

/// Scriptable in-memory session.
pub struct MockSession {
    state: SharedState,
    disconnects_tx: mpsc::Sender<DisconnectReason>,
    disconnects_rx: Option<mpsc::Receiver<DisconnectReason>>,
}

impl MockSession {
    pub fn new() -> Self {
        let (disconnects_tx, disconnects_rx) = mpsc::channel(8);
        Self {
            state: SharedState::default(),
            disconnects_tx,
            disconnects_rx: Some(disconnects_rx),
        }
    }

    pub fn failing_connect() -> Self {
        let session = Self::new();
        session.state.fail_connect.store(true, Ordering::SeqCst);
        session
    }

    pub fn failing_publish() -> Self {
        let session = Self::new();
        session.state.fail_publish.store(true, Ordering::SeqCst);
        session
    }

    pub fn handle(&self) -> MockSessionHandle {
        MockSessionHandle {
            state: self.state.clone(),
            disconnects: self.disconnects_tx.clone(),
        }
    }

    fn record_options(&self, options: SessionOptions) {
        *self.state.options.lock().unwrap() = Some(options);
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MqttSession for MockSession {
    async fn connect(&mut self, auth: &SessionAuth) -> Result<(), SessionError> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.state.auth_history.lock().unwrap().push(auth.clone());

        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(SessionError::ConnectFailed {
                host: "mock".to_string(),
                port: 0,
                detail: "scripted connect failure".to_string(),
            });
        }
        self.state.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<PublishAck, SessionError> {
        if !self.state.connected.load(Ordering::SeqCst) {
            return Err(SessionError::NotConnected);
        }
        if self.state.fail_publish.load(Ordering::SeqCst) {
            return Err(SessionError::PublishFailed {
                topic: topic.to_string(),
                detail: "scripted publish failure".to_string(),
            });
        }
        self.state
            .published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(PublishAck::published())
    }

    async fn reconnect(&mut self, auth: &SessionAuth) -> Result<(), SessionError> {
        self.connect(auth).await
    }

    async fn disconnect(&mut self) {
        self.state.connected.store(false, Ordering::SeqCst);
        let _ = self.disconnects_tx.send(DisconnectReason::Requested).await;
    }

    fn take_disconnect_events(&mut self) -> Option<mpsc::Receiver<DisconnectReason>> {
        self.disconnects_rx.take()
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}

/// Session factory for tests: pops scripted sessions in order, creating plain
/// ones when the script runs out.
#[derive(Default)]
pub struct MockSessionFactory {
    scripted: Mutex<VecDeque<MockSession>>,
    created: Mutex<Vec<MockSessionHandle>>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session for the next adapter construction.
    pub fn push_session(&self, session: MockSession) {
        self.scripted.lock().unwrap().push_back(session);
    }

    /// Handles to every created session, in creation order.
    pub fn created_handles(&self) -> Vec<MockSessionHandle> {
        self.created.lock().unwrap().clone()
    }
}

impl SessionFactory for MockSessionFactory {
    fn create(&self, options: SessionOptions) -> Box<dyn MqttSession> {
        let session = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        session.record_options(options);
        self.created.lock().unwrap().push(session.handle());
        Box::new(session)
    }
}
