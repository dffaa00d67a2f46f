//! Google Cloud IoT Core profile: signed JWT assertions over the MQTT bridge.
//!
//! The username is an unused placeholder; the password carries the RS256
//! assertion. The bridge terminates sessions once the assertion expires, so
//! every reconnect regenerates a fresh one with a new issued-at/expiry pair.

use super::CloudProfile;
use crate::config::GoogleArguments;
use crate::credentials::{
    create_device_jwt, read_secret_file, Credential, CredentialError, TlsMaterial,
};
use crate::session::SessionAuth;

pub struct GoogleProfile {
    project_id: String,
    cloud_region: String,
    registry_id: String,
    bridge_hostname: String,
    bridge_port: u16,
    private_key: Vec<u8>,
    ca: Vec<u8>,
}

impl GoogleProfile {
    pub fn new(args: &GoogleArguments) -> Result<Self, CredentialError> {
        let private_key = read_secret_file(&args.private_key)?;
        let ca = read_secret_file(&args.certificate_authority)?;

        Ok(Self {
            project_id: args.project_id.clone(),
            cloud_region: args.cloud_region.clone(),
            registry_id: args.registry_id.clone(),
            bridge_hostname: args.mqtt_bridge_hostname.clone(),
            bridge_port: args.mqtt_bridge_port,
            private_key,
            ca,
        })
    }

    fn fresh_assertion(&self) -> Result<Credential, CredentialError> {
        let (token, expires_at) = create_device_jwt(&self.project_id, &self.private_key)?;
        Ok(Credential::JwtAssertion { token, expires_at })
    }
}

impl CloudProfile for GoogleProfile {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    fn host(&self) -> &str {
        &self.bridge_hostname
    }

    fn port(&self) -> u16 {
        self.bridge_port
    }

    fn client_id(&self, device_name: &str) -> String {
        format!(
            "projects/{}/locations/{}/registries/{}/devices/{}",
            self.project_id, self.cloud_region, self.registry_id, device_name
        )
    }

    fn initial_credential(&self, _device_name: &str) -> Result<Credential, CredentialError> {
        self.fresh_assertion()
    }

    fn refreshed_credential(
        &self,
        _device_name: &str,
        _current: &Credential,
    ) -> Result<Credential, CredentialError> {
        self.fresh_assertion()
    }

    fn session_auth(&self, _device_name: &str, credential: &Credential) -> SessionAuth {
        SessionAuth {
            // The bridge ignores the username; the assertion is the password.
            username_password: Some((
                "unused".to_string(),
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
            Some(subtopic) => format!("/devices/{device_name}/events/{subtopic}"),
            None => format!("/devices/{device_name}/events"),
        }
    }
}
