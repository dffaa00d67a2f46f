//! rumqttc-backed session implementation.
//!
//! One `RumqttcSession` drives one broker connection. The event loop runs in
//! an owned driver task that reports the initial CONNACK and forwards later
//! connection losses over the session's disconnect channel; it stops polling
//! on error so that reconnection stays under the adapter's control instead
//! of the library's internal retry.

use super::{
    DisconnectReason, MqttSession, PublishAck, SessionAuth, SessionError, SessionFactory,
    SessionOptions,
};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CONNACK_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_CAPACITY: usize = 16;

pub struct RumqttcSession {
    options: SessionOptions,
    client: Option<AsyncClient>,
    driver: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    events_tx: mpsc::Sender<DisconnectReason>,
    events_rx: Option<mpsc::Receiver<DisconnectReason>>,
}

impl RumqttcSession {
    pub fn new(options: SessionOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            options,
            client: None,
            driver: None,
            connected: Arc::new(AtomicBool::new(false)),
            closing: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    fn mqtt_options(&self, auth: &SessionAuth) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(
            self.options.client_id.clone(),
            self.options.host.clone(),
            self.options.port,
        );
        mqtt_options.set_keep_alive(self.options.keep_alive);

        if let Some((username, password)) = &auth.username_password {
            mqtt_options.set_credentials(username.clone(), password.clone());
        }

        if let Some(tls) = &auth.tls {
            let alpn = tls
                .alpn
                .as_ref()
                .map(|protocols| protocols.iter().map(|p| p.as_bytes().to_vec()).collect());
            mqtt_options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca: tls.ca.clone(),
                alpn,
                client_auth: tls.client_auth.clone(),
            }));
        }

        mqtt_options
    }

    fn spawn_driver(
        &self,
        mut event_loop: rumqttc::EventLoop,
        connack_tx: oneshot::Sender<Result<(), SessionError>>,
    ) -> JoinHandle<()> {
        let connected = Arc::clone(&self.connected);
        let closing = Arc::clone(&self.closing);
        let events = self.events_tx.clone();
        let host = self.options.host.clone();
        let port = self.options.port;
        let mut connack_tx = Some(connack_tx);

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            connected.store(true, Ordering::SeqCst);
                            if let Some(tx) = connack_tx.take() {
                                let _ = tx.send(Ok(()));
                            }
                        } else {
                            connected.store(false, Ordering::SeqCst);
                            if let Some(tx) = connack_tx.take() {
                                let _ = tx.send(Err(SessionError::ConnectionRefused(format!(
                                    "{:?}",
                                    ack.code
                                ))));
                            }
                            break;
                        }
                    }
                    Ok(event) => {
                        debug!(host = %host, ?event, "mqtt event");
                    }
                    Err(err) => {
                        connected.store(false, Ordering::SeqCst);
                        if let Some(tx) = connack_tx.take() {
                            let _ = tx.send(Err(SessionError::ConnectFailed {
                                host: host.clone(),
                                port,
                                detail: err.to_string(),
                            }));
                        } else {
                            let reason = if closing.load(Ordering::SeqCst) {
                                DisconnectReason::Requested
                            } else {
                                DisconnectReason::ConnectionLost(err.to_string())
                            };
                            if events.send(reason).await.is_err() {
                                warn!(host = %host, "disconnect listener dropped");
                            }
                        }
                        // Stop polling: the adapter decides whether to reconnect.
                        break;
                    }
                }
            }
        })
    }

    fn abort_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn open(&mut self, auth: &SessionAuth) -> Result<(), SessionError> {
        self.abort_driver();
        self.closing.store(false, Ordering::SeqCst);

        let (client, event_loop) = AsyncClient::new(self.mqtt_options(auth), EVENT_CAPACITY);
        let (connack_tx, connack_rx) = oneshot::channel();
        let driver = self.spawn_driver(event_loop, connack_tx);

        let outcome = match tokio::time::timeout(CONNACK_TIMEOUT, connack_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::ConnectFailed {
                host: self.options.host.clone(),
                port: self.options.port,
                detail: "connection driver stopped before CONNACK".to_string(),
            }),
            Err(_) => Err(SessionError::ConnectFailed {
                host: self.options.host.clone(),
                port: self.options.port,
                detail: "timed out waiting for CONNACK".to_string(),
            }),
        };

        match outcome {
            Ok(()) => {
                self.client = Some(client);
                self.driver = Some(driver);
                debug!(host = %self.options.host, port = self.options.port, "session connected");
                Ok(())
            }
            Err(err) => {
                driver.abort();
                Err(err)
            }
        }
    }
}

#[async_trait]
impl MqttSession for RumqttcSession {
    async fn connect(&mut self, auth: &SessionAuth) -> Result<(), SessionError> {
        self.open(auth).await
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<PublishAck, SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let client = self.client.as_ref().ok_or(SessionError::NotConnected)?;

        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|err| SessionError::PublishFailed {
                topic: topic.to_string(),
                detail: err.to_string(),
            })?;

        // The broker accepted the hand-off; end-to-end delivery is QoS territory.
        Ok(PublishAck::published())
    }

    async fn reconnect(&mut self, auth: &SessionAuth) -> Result<(), SessionError> {
        self.open(auth).await
    }

    async fn disconnect(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Some(client) = &self.client {
            if let Err(err) = client.disconnect().await {
                debug!(host = %self.options.host, %err, "disconnect request failed");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn take_disconnect_events(&mut self) -> Option<mpsc::Receiver<DisconnectReason>> {
        self.events_rx.take()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for RumqttcSession {
    fn drop(&mut self) {
        self.abort_driver();
    }
}

/// Production session factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct RumqttcSessionFactory;

impl SessionFactory for RumqttcSessionFactory {
    fn create(&self, options: SessionOptions) -> Box<dyn MqttSession> {
        Box::new(RumqttcSession::new(options))
    }
}
