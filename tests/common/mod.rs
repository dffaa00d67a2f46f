//! Shared fixtures for integration tests: file-backed secrets and provider
//! argument builders. The returned temp files must be kept alive for as long
//! as the arguments referencing them are in use.

#![allow(dead_code)]

use cloudcast::config::{AwsArguments, AzureArguments, GoogleArguments};
use std::io::Write;
use tempfile::NamedTempFile;

pub const TEST_RSA_KEY: &str = include_str!("../fixtures/rsa_test_key.pem");
pub const TEST_SHARED_KEY: &str = "c2hhcmVkLWFjY2Vzcy1rZXktbWF0ZXJpYWw=";

pub fn secret_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file
}

pub fn aws_arguments() -> (AwsArguments, Vec<NamedTempFile>) {
    let ca = secret_file(b"amazon-root-ca");
    let cert = secret_file(b"device-cert");
    let key = secret_file(b"device-key");

    let args = AwsArguments {
        endpoint: "abc123.iot.eu-west-1.amazonaws.com".to_string(),
        certificate: cert.path().to_path_buf(),
        private_key: key.path().to_path_buf(),
        certificate_authority: ca.path().to_path_buf(),
        port: 443,
        protocol: "x-amzn-mqtt-ca".to_string(),
        device_location: "devices".to_string(),
    };
    (args, vec![ca, cert, key])
}

pub fn azure_arguments() -> (AzureArguments, Vec<NamedTempFile>) {
    let key = secret_file(TEST_SHARED_KEY.as_bytes());
    let ca = secret_file(b"azure-root-ca");

    let args = AzureArguments {
        endpoint: "hub.azure-devices.net".to_string(),
        key: key.path().to_path_buf(),
        api_version: "2018-06-30".to_string(),
        certificate_authority: ca.path().to_path_buf(),
        port: 8883,
    };
    (args, vec![key, ca])
}

pub fn google_arguments() -> (GoogleArguments, Vec<NamedTempFile>) {
    let key = secret_file(TEST_RSA_KEY.as_bytes());
    let ca = secret_file(b"google-roots");

    let args = GoogleArguments {
        project_id: "my-project".to_string(),
        cloud_region: "europe-west1".to_string(),
        registry_id: "my-registry".to_string(),
        mqtt_bridge_hostname: "mqtt.googleapis.com".to_string(),
        mqtt_bridge_port: 8883,
        private_key: key.path().to_path_buf(),
        certificate_authority: ca.path().to_path_buf(),
    };
    (args, vec![key, ca])
}
