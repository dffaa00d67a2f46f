//! The broadcast hub: concurrent fan-out to every configured provider.
//!
//! A hub is constructed once from a validated configuration and owns one
//! adapter per provider record, in configuration order. Construction either
//! fully succeeds or fails with the first provider's instantiation error;
//! there is no partial hub. Broadcasts never raise: they return the AND over
//! every adapter's publish result, with failures visible in the logs.

use crate::config::DeviceConfig;
use crate::error::HubResult;
use crate::provider::{create_adapter, Message, ProviderAdapter};
use crate::session::{RumqttcSessionFactory, SessionFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Default cap on simultaneous in-flight publishes per broadcast call.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 25;

pub struct MessageHub {
    device_name: String,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    publish_limit: Arc<Semaphore>,
}

impl MessageHub {
    /// Build a hub over real broker sessions.
    pub async fn new(config: DeviceConfig) -> HubResult<Self> {
        Self::with_session_factory(config, Arc::new(RumqttcSessionFactory)).await
    }

    /// Build a hub with an injected session factory.
    pub async fn with_session_factory(
        config: DeviceConfig,
        sessions: Arc<dyn SessionFactory>,
    ) -> HubResult<Self> {
        let reconnect_backoff = config.reconnect_backoff_ms.map(Duration::from_millis);
        let mut adapters = Vec::with_capacity(config.providers.len());
        for provider in &config.providers {
            adapters.push(
                create_adapter(
                    &config.device_name,
                    provider,
                    sessions.as_ref(),
                    reconnect_backoff,
                )
                .await?,
            );
        }

        info!(
            device = %config.device_name,
            providers = adapters.len(),
            "message hub ready"
        );
        Ok(Self {
            device_name: config.device_name,
            adapters,
            publish_limit: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        })
    }

    /// Override the in-flight publish cap (default 25).
    pub fn with_max_in_flight(mut self, cap: usize) -> Self {
        self.publish_limit = Arc::new(Semaphore::new(cap.max(1)));
        self
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Constructed adapters, in configuration order.
    pub fn adapters(&self) -> &[Arc<dyn ProviderAdapter>] {
        &self.adapters
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.adapters
            .iter()
            .map(|adapter| adapter.provider_name())
            .collect()
    }

    /// Publish `message` to every provider's default topic. True only if
    /// every provider accepted the message; vacuously true with no providers.
    pub async fn broadcast(&self, message: &Message) -> bool {
        self.fan_out(message, None).await
    }

    /// Publish `message` to every provider under the named subtopic.
    pub async fn broadcast_to_subtopic(&self, message: &Message, subtopic: &str) -> bool {
        self.fan_out(message, Some(subtopic)).await
    }

    async fn fan_out(&self, message: &Message, subtopic: Option<&str>) -> bool {
        let mut tasks = JoinSet::new();
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let permits = Arc::clone(&self.publish_limit);
            let message = message.clone();
            let subtopic = subtopic.map(str::to_string);

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                match subtopic.as_deref() {
                    Some(subtopic) => adapter.publish_to_subtopic(&message, subtopic).await,
                    None => adapter.publish(&message).await,
                }
            });
        }

        // Wait for every dispatched task; one slow or failing provider must
        // not abort the others, it only flips the aggregate.
        let mut all_published = true;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(published) => all_published &= published,
                Err(err) => {
                    error!(device = %self.device_name, %err, "broadcast task failed");
                    all_published = false;
                }
            }
        }
        all_published
    }

    /// Cleanly disconnect every provider session.
    pub async fn shutdown(&self) {
        for adapter in &self.adapters {
            adapter.shutdown().await;
        }
        info!(device = %self.device_name, "message hub shut down");
    }
}
