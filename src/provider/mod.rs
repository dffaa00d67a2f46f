//! Provider adapters: per-cloud connection, authentication and topic logic.
//!
//! The shared machinery lives in [`Adapter`], a state machine generic over a
//! [`CloudProfile`]. The profile is the per-cloud part: it computes
//! credentials (and recomputes them when a session drops), formats topics and
//! derives session authentication. Composition keeps the clouds free of
//! shared mutable state; the only thing they have in common is the device
//! identity they format into topics.

use crate::credentials::{Credential, CredentialError};
use crate::session::{
    DisconnectReason, MqttSession, SessionAuth, SessionError, SessionFactory, SessionOptions,
    SessionState,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

pub mod aws;
pub mod azure;
pub mod factory;
pub mod google;

pub use aws::AwsProfile;
pub use azure::AzureProfile;
pub use factory::create_adapter;
pub use google::GoogleProfile;

/// A telemetry message: a key/value mapping serialized to canonical JSON.
pub type Message = serde_json::Map<String, serde_json::Value>;

/// The per-cloud half of an adapter: credential provider, topic formatter and
/// connection coordinates for one provider kind.
pub trait CloudProfile: Send + Sync + 'static {
    fn provider_name(&self) -> &'static str;

    fn host(&self) -> &str;

    fn port(&self) -> u16;

    /// MQTT client identifier for this device.
    fn client_id(&self, device_name: &str) -> String;

    /// Compute the credential used to open the first session.
    fn initial_credential(&self, device_name: &str) -> Result<Credential, CredentialError>;

    /// Compute the credential for a reconnect after an unexpected drop.
    ///
    /// Expiring kinds must produce a fresh expiry window from now; mutual-TLS
    /// material is reused unchanged.
    fn refreshed_credential(
        &self,
        device_name: &str,
        current: &Credential,
    ) -> Result<Credential, CredentialError>;

    /// Derive session authentication from a credential.
    fn session_auth(&self, device_name: &str, credential: &Credential) -> SessionAuth;

    /// Map the default topic (`subtopic = None`) or a named subtopic to this
    /// cloud's topic string. Pure: same inputs, same string.
    fn format_topic(&self, device_name: &str, subtopic: Option<&str>) -> String;
}

/// Capability set shared by every provider adapter.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn device_name(&self) -> &str;

    /// Topic for the default stream or a named subtopic.
    fn format_topic(&self, subtopic: Option<&str>) -> String;

    /// Publish to the default topic. Never raises: serialization and session
    /// failures are logged and reported as `false`.
    async fn publish(&self, message: &Message) -> bool;

    /// Publish under the cloud's subtopic convention.
    async fn publish_to_subtopic(&self, message: &Message, subtopic: &str) -> bool;

    /// Handle a session drop. Non-clean drops refresh credentials and attempt
    /// one reconnect; clean disconnects leave the session down.
    async fn on_disconnect(&self, reason: DisconnectReason);

    /// Cleanly close the session.
    async fn shutdown(&self);

    async fn state(&self) -> SessionState;
}

/// Failures while constructing an adapter. Internal: the factory narrows
/// these to [`crate::HubError::ProviderInstantiation`].
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

struct AdapterInner {
    session: Box<dyn MqttSession>,
    credential: Credential,
    state: SessionState,
}

/// Shared adapter state machine, composed with a per-cloud profile.
///
/// All mutable state (session, credential, state) sits behind one async lock,
/// so at most one publish or disconnect-handling runs at a time and a
/// reconnect in progress blocks only this adapter.
pub struct Adapter<P: CloudProfile> {
    device_name: String,
    profile: P,
    reconnect_backoff: Option<Duration>,
    inner: Mutex<AdapterInner>,
}

impl<P: CloudProfile> Adapter<P> {
    /// Build the initial credential, open the session and wire disconnect
    /// events back into the adapter. On any failure no adapter escapes.
    pub async fn connect(
        device_name: &str,
        profile: P,
        sessions: &dyn SessionFactory,
        reconnect_backoff: Option<Duration>,
    ) -> Result<Arc<Self>, AdapterError> {
        let credential = profile.initial_credential(device_name)?;
        let options = SessionOptions::new(
            profile.client_id(device_name),
            profile.host().to_string(),
            profile.port(),
        );

        debug!(
            provider = profile.provider_name(),
            device = device_name,
            host = %options.host,
            "opening provider session"
        );

        let mut inner = AdapterInner {
            session: sessions.create(options),
            credential,
            state: SessionState::Connecting,
        };
        let auth = profile.session_auth(device_name, &inner.credential);
        inner.session.connect(&auth).await?;
        inner.state = SessionState::Connected;

        let events = inner.session.take_disconnect_events();
        let adapter = Arc::new(Self {
            device_name: device_name.to_string(),
            profile,
            reconnect_backoff,
            inner: Mutex::new(inner),
        });

        if let Some(events) = events {
            spawn_disconnect_watcher(Arc::clone(&adapter) as Arc<dyn ProviderAdapter>, events);
        }

        info!(
            provider = adapter.profile.provider_name(),
            device = device_name,
            "provider adapter connected"
        );
        Ok(adapter)
    }

    /// Snapshot of the credential currently in use.
    pub async fn credential(&self) -> Credential {
        self.inner.lock().await.credential.clone()
    }

    async fn publish_on(&self, message: &Message, subtopic: Option<&str>) -> bool {
        let provider = self.profile.provider_name();
        let topic = self.profile.format_topic(&self.device_name, subtopic);

        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    provider,
                    device = %self.device_name,
                    %err,
                    "could not serialize message"
                );
                return false;
            }
        };

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Connected {
            warn!(
                provider,
                device = %self.device_name,
                state = ?inner.state,
                %topic,
                "skipping publish, session is not connected"
            );
            return false;
        }

        match inner.session.publish(&topic, payload).await {
            Ok(ack) => {
                debug!(
                    provider,
                    device = %self.device_name,
                    %topic,
                    published = ack.is_published(),
                    "message handed to broker"
                );
                ack.is_published()
            }
            Err(err) => {
                warn!(
                    provider,
                    device = %self.device_name,
                    %topic,
                    %err,
                    "could not publish message"
                );
                false
            }
        }
    }
}

#[async_trait]
impl<P: CloudProfile> ProviderAdapter for Adapter<P> {
    fn provider_name(&self) -> &'static str {
        self.profile.provider_name()
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn format_topic(&self, subtopic: Option<&str>) -> String {
        self.profile.format_topic(&self.device_name, subtopic)
    }

    async fn publish(&self, message: &Message) -> bool {
        self.publish_on(message, None).await
    }

    async fn publish_to_subtopic(&self, message: &Message, subtopic: &str) -> bool {
        self.publish_on(message, Some(subtopic)).await
    }

    async fn on_disconnect(&self, reason: DisconnectReason) {
        let provider = self.profile.provider_name();
        let mut inner = self.inner.lock().await;

        if reason.is_clean() {
            inner.state = SessionState::Disconnected;
            debug!(provider, device = %self.device_name, "session closed cleanly");
            return;
        }

        warn!(
            provider,
            device = %self.device_name,
            ?reason,
            "session dropped, refreshing credentials and reconnecting"
        );
        inner.state = SessionState::Reconnecting;

        let fresh = match self
            .profile
            .refreshed_credential(&self.device_name, &inner.credential)
        {
            Ok(credential) => credential,
            Err(err) => {
                error!(
                    provider,
                    device = %self.device_name,
                    %err,
                    "credential refresh failed, session left disconnected"
                );
                inner.state = SessionState::Disconnected;
                return;
            }
        };

        if let Some(backoff) = self.reconnect_backoff {
            tokio::time::sleep(backoff).await;
        }

        let auth = self.profile.session_auth(&self.device_name, &fresh);
        match inner.session.reconnect(&auth).await {
            Ok(()) => {
                inner.credential = fresh;
                inner.state = SessionState::Connected;
                info!(provider, device = %self.device_name, "session reconnected");
            }
            Err(err) => {
                error!(
                    provider,
                    device = %self.device_name,
                    %err,
                    "reconnect failed, session left disconnected"
                );
                inner.state = SessionState::Disconnected;
            }
        }
    }

    async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.session.disconnect().await;
        inner.state = SessionState::Disconnected;
        debug!(
            provider = self.profile.provider_name(),
            device = %self.device_name,
            "adapter shut down"
        );
    }

    async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }
}

/// Forward a session's disconnect events into the adapter's own handler. The
/// closure captures only the adapter handle, never references into other
/// adapters.
pub(crate) fn spawn_disconnect_watcher(
    adapter: Arc<dyn ProviderAdapter>,
    mut events: mpsc::Receiver<DisconnectReason>,
) {
    tokio::spawn(async move {
        while let Some(reason) = events.recv().await {
            adapter.on_disconnect(reason).await;
        }
    });
}
