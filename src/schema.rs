//! JSON Schema validation for raw configuration values.
//!
//! Structural validation runs before any typed deserialization or network
//! activity: a configuration value either comes out of here untouched or the
//! whole load fails with a [`ConfigError`]. The schemas mirror the published
//! configuration contract one-to-one, so a record accepted here always
//! deserializes into [`crate::config::DeviceConfig`].

use crate::config::ConfigError;
use serde_json::{json, Value};

fn aws_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "arguments"],
        "additionalProperties": false,
        "properties": {
            "name": { "const": "aws" },
            "arguments": {
                "type": "object",
                "required": ["endpoint", "certificate", "private_key"],
                "additionalProperties": false,
                "properties": {
                    "endpoint": { "type": "string", "minLength": 1 },
                    "certificate": { "type": "string", "minLength": 1 },
                    "private_key": { "type": "string", "minLength": 1 },
                    "certificate_authority": { "type": "string", "minLength": 1 },
                    "port": { "type": "integer", "minimum": 1025, "maximum": 64999 },
                    "protocol": { "type": "string", "minLength": 1 },
                    "device_location": { "type": "string", "minLength": 1 }
                }
            }
        }
    })
}

fn azure_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "arguments"],
        "additionalProperties": false,
        "properties": {
            "name": { "const": "azure" },
            "arguments": {
                "type": "object",
                "required": ["endpoint", "key"],
                "additionalProperties": false,
                "properties": {
                    "endpoint": { "type": "string", "minLength": 1 },
                    "key": { "type": "string", "minLength": 1 },
                    "api_version": { "type": "string", "minLength": 1 },
                    "certificate_authority": { "type": "string", "minLength": 1 },
                    "port": { "type": "integer", "minimum": 1025, "maximum": 64999 }
                }
            }
        }
    })
}

fn google_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "arguments"],
        "additionalProperties": false,
        "properties": {
            "name": { "const": "google" },
            "arguments": {
                "type": "object",
                "required": [
                    "project_id",
                    "cloud_region",
                    "registry_id",
                    "mqtt_bridge_hostname",
                    "mqtt_bridge_port",
                    "private_key"
                ],
                "additionalProperties": false,
                "properties": {
                    "project_id": { "type": "string", "minLength": 1 },
                    "cloud_region": { "type": "string", "minLength": 1 },
                    "registry_id": { "type": "string", "minLength": 1 },
                    "mqtt_bridge_hostname": { "type": "string", "minLength": 1 },
                    "mqtt_bridge_port": { "type": "integer", "minimum": 1025, "maximum": 64999 },
                    "private_key": { "type": "string", "minLength": 1 },
                    "certificate_authority": { "type": "string", "minLength": 1 }
                }
            }
        }
    })
}

/// Schema for a single provider record: exactly one cloud tag must match.
pub fn provider_schema() -> Value {
    json!({ "oneOf": [aws_schema(), azure_schema(), google_schema()] })
}

/// Schema for the full device configuration.
pub fn configuration_schema() -> Value {
    json!({
        "type": "object",
        "required": ["device_name", "providers"],
        "additionalProperties": false,
        "properties": {
            "device_name": { "type": "string", "minLength": 1 },
            "providers": { "type": "array", "items": provider_schema() },
            "reconnect_backoff_ms": { "type": "integer", "minimum": 0 }
        }
    })
}

/// Validate a raw configuration value against [`configuration_schema`].
pub fn validate_configuration(value: &Value) -> Result<(), ConfigError> {
    validate_against(&configuration_schema(), value)
}

/// Validate a single raw provider record against [`provider_schema`].
pub fn validate_provider(value: &Value) -> Result<(), ConfigError> {
    validate_against(&provider_schema(), value)
}

fn validate_against(schema: &Value, instance: &Value) -> Result<(), ConfigError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ConfigError::SchemaCompile(format!("schema compilation error: {e}")))?;

    validator.validate(instance).map_err(|errors| {
        let messages: Vec<String> = errors
            .map(|e| format!("at '{}': {}", e.instance_path, e))
            .collect();
        ConfigError::SchemaValidation(messages.join("; "))
    })
}
