//! The consumed MQTT session interface.
//!
//! Adapters depend only on the [`MqttSession`] trait: connect with some
//! authentication material, publish a payload to a topic, reconnect with
//! possibly different material, and surface disconnect events. Any
//! conforming MQTT client can sit behind it; [`mqtt::RumqttcSession`] is the
//! production implementation and the mocks in [`crate::testing`] stand in for
//! it under test.

use crate::credentials::TlsMaterial;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod mqtt;

pub use mqtt::{RumqttcSession, RumqttcSessionFactory};

/// Connection state of one adapter's session. The owning adapter is the sole
/// mutator; transitions are driven only by connect and disconnect events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Caller-initiated, clean disconnect. No reconnection is attempted.
    Requested,
    /// The broker connection dropped unexpectedly.
    ConnectionLost(String),
}

impl DisconnectReason {
    pub fn is_clean(&self) -> bool {
        matches!(self, DisconnectReason::Requested)
    }
}

/// Connection coordinates, independent of authentication material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
}

impl SessionOptions {
    pub fn new(client_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            client_id: client_id.into(),
            host: host.into(),
            port,
            keep_alive: Duration::from_secs(60),
        }
    }
}

/// Authentication inputs for one (re)connection attempt, derived from the
/// adapter's current credential.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAuth {
    pub username_password: Option<(String, String)>,
    pub tls: Option<TlsMaterial>,
}

impl SessionAuth {
    pub fn tls_only(tls: TlsMaterial) -> Self {
        Self {
            username_password: None,
            tls: Some(tls),
        }
    }
}

/// Broker hand-off acknowledgement for one publish call.
///
/// This reports local broker acceptance of the message, not end-to-end
/// delivery confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishAck {
    published: bool,
}

impl PublishAck {
    pub fn published() -> Self {
        Self { published: true }
    }

    pub fn rejected() -> Self {
        Self { published: false }
    }

    pub fn is_published(&self) -> bool {
        self.published
    }
}

/// Session-level failures. These stay inside the adapter: publish failures
/// become a `false` publish result, connect failures become instantiation or
/// reconnect failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection to {host}:{port} failed: {detail}")]
    ConnectFailed {
        host: String,
        port: u16,
        detail: String,
    },
    #[error("broker rejected the connection: {0}")]
    ConnectionRefused(String),
    #[error("publish to '{topic}' failed: {detail}")]
    PublishFailed { topic: String, detail: String },
    #[error("session is not connected")]
    NotConnected,
}

/// One live broker connection. Exactly one session exists per adapter per
/// process lifetime; reconnects reuse the session object and its disconnect
/// event channel.
#[async_trait]
pub trait MqttSession: Send + Sync {
    /// Open the connection and wait for the broker to accept it.
    async fn connect(&mut self, auth: &SessionAuth) -> Result<(), SessionError>;

    /// Hand one payload to the broker.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<PublishAck, SessionError>;

    /// Re-open the connection with (possibly refreshed) authentication.
    async fn reconnect(&mut self, auth: &SessionAuth) -> Result<(), SessionError>;

    /// Cleanly close the connection.
    async fn disconnect(&mut self);

    /// Take the disconnect event stream. Yields once per connection loss for
    /// the lifetime of the session; callable once.
    fn take_disconnect_events(&mut self) -> Option<mpsc::Receiver<DisconnectReason>>;

    fn is_connected(&self) -> bool;
}

/// Builds sessions for adapters; injected so tests can substitute mocks.
pub trait SessionFactory: Send + Sync {
    fn create(&self, options: SessionOptions) -> Box<dyn MqttSession>;
}
