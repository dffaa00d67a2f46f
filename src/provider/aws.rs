//! AWS IoT Core profile: mutual TLS over an ALPN-restricted context.
//!
//! No username or password is involved; the certificate pair is the
//! credential, and it does not expire in this model. A reconnect therefore
//! reuses the exact TLS material the session was opened with.

use super::CloudProfile;
use crate::config::AwsArguments;
use crate::credentials::{read_secret_file, Credential, CredentialError, TlsMaterial};
use crate::session::SessionAuth;

pub struct AwsProfile {
    endpoint: String,
    port: u16,
    device_location: String,
    tls: TlsMaterial,
}

impl AwsProfile {
    /// Load the CA bundle, device certificate and private key from disk and
    /// restrict the TLS context to the configured application protocol.
    pub fn new(args: &AwsArguments) -> Result<Self, CredentialError> {
        let ca = read_secret_file(&args.certificate_authority)?;
        let certificate = read_secret_file(&args.certificate)?;
        let private_key = read_secret_file(&args.private_key)?;

        Ok(Self {
            endpoint: args.endpoint.clone(),
            port: args.port,
            device_location: args.device_location.clone(),
            tls: TlsMaterial {
                ca,
                client_auth: Some((certificate, private_key)),
                alpn: Some(vec![args.protocol.clone()]),
            },
        })
    }
}

impl CloudProfile for AwsProfile {
    fn provider_name(&self) -> &'static str {
        "aws"
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
        Ok(Credential::MutualTls(self.tls.clone()))
    }

    fn refreshed_credential(
        &self,
        _device_name: &str,
        current: &Credential,
    ) -> Result<Credential, CredentialError> {
        // The certificate pair does not expire; reconnect with what we have.
        Ok(current.clone())
    }

    fn session_auth(&self, _device_name: &str, credential: &Credential) -> SessionAuth {
        let tls = match credential {
            Credential::MutualTls(material) => material.clone(),
            _ => self.tls.clone(),
        };
        SessionAuth::tls_only(tls)
    }

    fn format_topic(&self, device_name: &str, subtopic: Option<&str>) -> String {
        match subtopic {
            Some(subtopic) => format!(
                "{}/{}/events/{}",
                self.device_location, device_name, subtopic
            ),
            None => format!("{}/{}/events", self.device_location, device_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialKind;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn secret_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    fn test_args(ca: &NamedTempFile, cert: &NamedTempFile, key: &NamedTempFile) -> AwsArguments {
        AwsArguments {
            endpoint: "abc123.iot.eu-west-1.amazonaws.com".to_string(),
            certificate: cert.path().to_path_buf(),
            private_key: key.path().to_path_buf(),
            certificate_authority: ca.path().to_path_buf(),
            port: 443,
            protocol: "x-amzn-mqtt-ca".to_string(),
            device_location: "devices".to_string(),
        }
    }

    #[test]
    fn test_profile_loads_tls_material() {
        let ca = secret_file(b"ca-bytes");
        let cert = secret_file(b"cert-bytes");
        let key = secret_file(b"key-bytes");

        let profile = AwsProfile::new(&test_args(&ca, &cert, &key)).unwrap();
        let credential = profile.initial_credential("d1").unwrap();
        assert_eq!(credential.kind(), CredentialKind::MutualTls);
        assert_eq!(credential.expires_at(), None);

        let auth = profile.session_auth("d1", &credential);
        assert!(auth.username_password.is_none());
        let tls = auth.tls.unwrap();
        assert_eq!(tls.ca, b"ca-bytes");
        assert_eq!(tls.alpn, Some(vec!["x-amzn-mqtt-ca".to_string()]));
        assert_eq!(
            tls.client_auth,
            Some((b"cert-bytes".to_vec(), b"key-bytes".to_vec()))
        );
    }

    #[test]
    fn test_missing_certificate_fails() {
        let ca = secret_file(b"ca");
        let key = secret_file(b"key");
        let mut args = test_args(&ca, &ca, &key);
        args.certificate = PathBuf::from("/nonexistent/device.pem.crt");

        assert!(matches!(
            AwsProfile::new(&args),
            Err(CredentialError::FileRead { .. })
        ));
    }

    #[test]
    fn test_refresh_keeps_identical_credential() {
        let ca = secret_file(b"ca");
        let cert = secret_file(b"cert");
        let key = secret_file(b"key");
        let profile = AwsProfile::new(&test_args(&ca, &cert, &key)).unwrap();

        let current = profile.initial_credential("d1").unwrap();
        let refreshed = profile.refreshed_credential("d1", &current).unwrap();
        assert_eq!(current, refreshed);
    }

    #[test]
    fn test_topic_format() {
        let ca = secret_file(b"ca");
        let cert = secret_file(b"cert");
        let key = secret_file(b"key");
        let profile = AwsProfile::new(&test_args(&ca, &cert, &key)).unwrap();

        assert_eq!(profile.format_topic("d1", None), "devices/d1/events");
        assert_eq!(
            profile.format_topic("d1", Some("status")),
            "devices/d1/events/status"
        );
    }
}
