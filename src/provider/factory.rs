//! Adapter factory: closed dispatch from a provider record to an adapter.
//!
//! The match over [`ProviderConfig`] is resolved at compile time; an
//! unrecognized provider tag can never reach this point because the
//! configuration layer rejects it. Every construction failure, whatever its
//! cause, is narrowed to a single [`HubError::ProviderInstantiation`] naming
//! the offending provider.

use super::{Adapter, AwsProfile, AzureProfile, GoogleProfile, ProviderAdapter};
use crate::config::ProviderConfig;
use crate::error::{HubError, HubResult};
use crate::session::SessionFactory;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Build and connect the adapter selected by `config`'s provider tag.
pub async fn create_adapter(
    device_name: &str,
    config: &ProviderConfig,
    sessions: &dyn SessionFactory,
    reconnect_backoff: Option<Duration>,
) -> HubResult<Arc<dyn ProviderAdapter>> {
    let provider = config.provider_name();
    debug!(provider, device = device_name, "instantiating provider adapter");

    let adapter: Arc<dyn ProviderAdapter> = match config {
        ProviderConfig::Aws(args) => {
            let profile = AwsProfile::new(args)
                .map_err(|err| HubError::provider_instantiation(provider, err))?;
            Adapter::connect(device_name, profile, sessions, reconnect_backoff)
                .await
                .map_err(|err| HubError::provider_instantiation(provider, err))?
        }
        ProviderConfig::Azure(args) => {
            let profile = AzureProfile::new(args)
                .map_err(|err| HubError::provider_instantiation(provider, err))?;
            Adapter::connect(device_name, profile, sessions, reconnect_backoff)
                .await
                .map_err(|err| HubError::provider_instantiation(provider, err))?
        }
        ProviderConfig::Google(args) => {
            let profile = GoogleProfile::new(args)
                .map_err(|err| HubError::provider_instantiation(provider, err))?;
            Adapter::connect(device_name, profile, sessions, reconnect_backoff)
                .await
                .map_err(|err| HubError::provider_instantiation(provider, err))?
        }
    };

    Ok(adapter)
}
