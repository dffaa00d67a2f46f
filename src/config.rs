//! Typed configuration for the fan-out publisher.
//!
//! A configuration is a device name plus an ordered list of provider records.
//! Raw JSON is validated against the schemas in [`crate::schema`] before it is
//! deserialized here, so the typed structs never see a structurally invalid
//! record. Provider records are a closed tagged enum: an unrecognized `name`
//! tag is a configuration error, not a runtime dispatch failure.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Device-level configuration: identity plus one record per cloud provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Name of the publishing device, shared read-only by every adapter.
    pub device_name: String,
    /// Ordered provider records; one adapter is built per record.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Optional delay before the single reconnect attempt after an
    /// unexpected disconnect. Unset means reconnect immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_backoff_ms: Option<u64>,
}

impl DeviceConfig {
    /// Build a configuration from a raw JSON value, schema-validating first.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        crate::schema::validate_configuration(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_value(value)
    }
}

/// One provider record: the `name` tag selects the cloud, `arguments` carries
/// that cloud's connection material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", content = "arguments", rename_all = "lowercase")]
pub enum ProviderConfig {
    Aws(AwsArguments),
    Azure(AzureArguments),
    Google(GoogleArguments),
}

impl ProviderConfig {
    /// The configuration tag this record was selected by.
    pub fn provider_name(&self) -> &'static str {
        match self {
            ProviderConfig::Aws(_) => "aws",
            ProviderConfig::Azure(_) => "azure",
            ProviderConfig::Google(_) => "google",
        }
    }
}

/// AWS IoT Core connection arguments (mutual TLS, ALPN-restricted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsArguments {
    /// Account-specific IoT endpoint hostname.
    pub endpoint: String,
    /// Path to the device certificate (PEM).
    pub certificate: PathBuf,
    /// Path to the device private key (PEM).
    pub private_key: PathBuf,
    #[serde(default = "default_aws_certificate_authority")]
    pub certificate_authority: PathBuf,
    #[serde(default = "default_aws_port")]
    pub port: u16,
    /// ALPN protocol name the TLS context is restricted to.
    #[serde(default = "default_aws_protocol")]
    pub protocol: String,
    /// First topic segment, ahead of the device name.
    #[serde(default = "default_device_location")]
    pub device_location: String,
}

fn default_aws_certificate_authority() -> PathBuf {
    PathBuf::from("AmazonRootCA1.pem")
}

fn default_aws_port() -> u16 {
    443
}

fn default_aws_protocol() -> String {
    "x-amzn-mqtt-ca".to_string()
}

fn default_device_location() -> String {
    "devices".to_string()
}

/// Azure IoT Hub connection arguments (shared-access-signature tokens).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AzureArguments {
    /// IoT Hub hostname, also the resource URI that gets signed.
    pub endpoint: String,
    /// Path to the file holding the base64 shared access key.
    pub key: PathBuf,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
    #[serde(default = "default_azure_certificate_authority")]
    pub certificate_authority: PathBuf,
    #[serde(default = "default_azure_port")]
    pub port: u16,
}

fn default_azure_api_version() -> String {
    "2018-06-30".to_string()
}

fn default_azure_certificate_authority() -> PathBuf {
    PathBuf::from("AzureRootCA.pem")
}

fn default_azure_port() -> u16 {
    8883
}

/// Google Cloud IoT Core connection arguments (signed JWT assertions).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleArguments {
    pub project_id: String,
    pub cloud_region: String,
    pub registry_id: String,
    pub mqtt_bridge_hostname: String,
    pub mqtt_bridge_port: u16,
    /// Path to the RS256 private key (PEM).
    pub private_key: PathBuf,
    #[serde(default = "default_google_certificate_authority")]
    pub certificate_authority: PathBuf,
}

fn default_google_certificate_authority() -> PathBuf {
    PathBuf::from("GoogleRoots.pem")
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("failed to parse configuration JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("configuration schema could not be compiled: {0}")]
    SchemaCompile(String),
    #[error("invalid configuration: {0}")]
    SchemaValidation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_configuration_deserializes() {
        let value = json!({
            "device_name": "sensor-1",
            "providers": [
                {
                    "name": "aws",
                    "arguments": {
                        "endpoint": "abc123.iot.eu-west-1.amazonaws.com",
                        "certificate": "/etc/keys/device.pem.crt",
                        "private_key": "/etc/keys/device.private.key"
                    }
                },
                {
                    "name": "azure",
                    "arguments": {
                        "endpoint": "hub.azure-devices.net",
                        "key": "/etc/keys/azure.key"
                    }
                },
                {
                    "name": "google",
                    "arguments": {
                        "project_id": "my-project",
                        "cloud_region": "europe-west1",
                        "registry_id": "my-registry",
                        "mqtt_bridge_hostname": "mqtt.googleapis.com",
                        "mqtt_bridge_port": 8883,
                        "private_key": "/etc/keys/rsa_private.pem"
                    }
                }
            ]
        });

        let config = DeviceConfig::from_value(value).unwrap();
        assert_eq!(config.device_name, "sensor-1");
        assert_eq!(config.providers.len(), 3);
        assert_eq!(
            config
                .providers
                .iter()
                .map(ProviderConfig::provider_name)
                .collect::<Vec<_>>(),
            vec!["aws", "azure", "google"]
        );
        assert_eq!(config.reconnect_backoff_ms, None);
    }

    #[test]
    fn test_aws_defaults_applied() {
        let value = json!({
            "device_name": "sensor-1",
            "providers": [{
                "name": "aws",
                "arguments": {
                    "endpoint": "abc123.iot.eu-west-1.amazonaws.com",
                    "certificate": "/etc/keys/device.pem.crt",
                    "private_key": "/etc/keys/device.private.key"
                }
            }]
        });

        let config = DeviceConfig::from_value(value).unwrap();
        match &config.providers[0] {
            ProviderConfig::Aws(args) => {
                assert_eq!(args.port, 443);
                assert_eq!(args.protocol, "x-amzn-mqtt-ca");
                assert_eq!(args.device_location, "devices");
                assert_eq!(
                    args.certificate_authority,
                    PathBuf::from("AmazonRootCA1.pem")
                );
            }
            other => panic!("expected aws record, got {other:?}"),
        }
    }

    #[test]
    fn test_azure_defaults_applied() {
        let value = json!({
            "device_name": "sensor-1",
            "providers": [{
                "name": "azure",
                "arguments": {
                    "endpoint": "hub.azure-devices.net",
                    "key": "/etc/keys/azure.key"
                }
            }]
        });

        let config = DeviceConfig::from_value(value).unwrap();
        match &config.providers[0] {
            ProviderConfig::Azure(args) => {
                assert_eq!(args.port, 8883);
                assert_eq!(args.api_version, "2018-06-30");
            }
            other => panic!("expected azure record, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let value = json!({
            "device_name": "sensor-1",
            "providers": [{ "name": "oracle", "arguments": {} }]
        });

        let result = DeviceConfig::from_value(value);
        assert!(matches!(result, Err(ConfigError::SchemaValidation(_))));
    }

    #[test]
    fn test_reconnect_backoff_is_optional_and_explicit() {
        let value = json!({
            "device_name": "sensor-1",
            "providers": [],
            "reconnect_backoff_ms": 250
        });

        let config = DeviceConfig::from_value(value).unwrap();
        assert_eq!(config.reconnect_backoff_ms, Some(250));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "device_name": "sensor-9", "providers": [] }}"#
        )
        .unwrap();

        let config = DeviceConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.device_name, "sensor-9");
        assert!(config.providers.is_empty());
    }
}
