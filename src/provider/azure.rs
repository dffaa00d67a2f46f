//! Azure IoT Hub profile: shared-access-signature authentication.
//!
//! The SAS token expires independently of the connection, so a non-clean
//! disconnect always recomputes a fresh token with a new expiry window from
//! now. A stale token is never reused for a reconnect.

use super::CloudProfile;
use crate::config::AzureArguments;
use crate::credentials::{
    generate_sas_token, read_secret_file, Credential, CredentialError, TlsMaterial,
    DEFAULT_SAS_TTL_SECS,
};
use crate::session::SessionAuth;
use chrono::Duration;

pub struct AzureProfile {
    endpoint: String,
    port: u16,
    api_version: String,
    shared_key: String,
    ca: Vec<u8>,
    token_ttl: Duration,
}

impl AzureProfile {
    pub fn new(args: &AzureArguments) -> Result<Self, CredentialError> {
        let key_bytes = read_secret_file(&args.key)?;
        let shared_key = String::from_utf8_lossy(&key_bytes).trim().to_string();
        let ca = read_secret_file(&args.certificate_authority)?;

        Ok(Self {
            endpoint: args.endpoint.clone(),
            port: args.port,
            api_version: args.api_version.clone(),
            shared_key,
            ca,
            token_ttl: Duration::seconds(DEFAULT_SAS_TTL_SECS),
        })
    }

    fn username(&self, device_name: &str) -> String {
        format!(
            "{}/{}/?api-version={}",
            self.endpoint, device_name, self.api_version
        )
    }

    fn fresh_token(&self) -> Result<Credential, CredentialError> {
        let (token, expires_at) =
            generate_sas_token(&self.endpoint, &self.shared_key, self.token_ttl)?;
        Ok(Credential::SasToken { token, expires_at })
    }
}

impl CloudProfile for AzureProfile {
    fn provider_name(&self) -> &'static str {
        "azure"
    }

    fn host(&self) -> &str {
        &self.endpoint
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn client_id(&self, device_name: &str) -> String {
        device_name.to_string()
    }

    fn initial_credential(&self, _device_name: &str) -> Result<Credential, CredentialError> {
        self.fresh_token()
    }

    fn refreshed_credential(
        &self,
        _device_name: &str,
        _current: &Credential,
    ) -> Result<Credential, CredentialError> {
        self.fresh_token()
    }

    fn session_auth(&self, device_name: &str, credential: &Credential) -> SessionAuth {
        SessionAuth {
            username_password: Some((
                self.username(device_name),
                credential.secret().unwrap_or_default().to_string(),
            )),
            tls: Some(TlsMaterial {
                ca: self.ca.clone(),
                client_auth: None,
                alpn: None,
            }),
        }
    }

    fn format_topic(&self, device_name: &str, subtopic: Option<&str>) -> String {
        match subtopic {
            Some(subtopic) => format!("devices/{device_name}/messages/events/topic={subtopic}"),
            None => format!("devices/{device_name}/messages/events"),
        }
    }
}
