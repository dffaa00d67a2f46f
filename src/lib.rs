//! cloudcast - multi-cloud MQTT telemetry fan-out
//!
//! Publishes one device's telemetry to several cloud IoT brokers (AWS IoT
//! Core, Azure IoT Hub, Google Cloud IoT Core) through a single interface,
//! reporting aggregate success across all of them.
//!
//! # Overview
//!
//! This crate provides:
//! - Per-cloud provider adapters owning one broker session each, including
//!   credential computation and refresh-on-disconnect
//! - Topic formatting per cloud convention
//! - A broadcast hub fanning one message out to every provider concurrently
//! - Schema-validated JSON configuration
//!
//! # Quick Start
//!
//! ```no_run
//! use cloudcast::{DeviceConfig, Message, MessageHub};
//! use serde_json::json;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeviceConfig::load_from_file(Path::new("device.json"))?;
//!     let hub = MessageHub::new(config).await?;
//!
//!     let mut message = Message::new();
//!     message.insert("temperature".to_string(), json!(21));
//!
//!     // True only if every configured provider accepted the message.
//!     let delivered = hub.broadcast(&message).await;
//!     println!("all providers accepted: {delivered}");
//!
//!     hub.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod hub;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod session;
pub mod testing;

pub use config::{AwsArguments, AzureArguments, DeviceConfig, GoogleArguments, ProviderConfig};
pub use credentials::{Credential, CredentialKind};
pub use error::{HubError, HubResult};
pub use hub::{MessageHub, DEFAULT_MAX_IN_FLIGHT};
pub use provider::{Adapter, CloudProfile, Message, ProviderAdapter};
pub use session::{DisconnectReason, MqttSession, SessionFactory, SessionState};
