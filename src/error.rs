//! Error types for the fan-out publisher.
//!
//! Construction is the only fallible public operation: broadcast calls report
//! failure through their boolean result, never through an error. Failures
//! while building a provider adapter are narrowed to a single
//! [`HubError::ProviderInstantiation`] so callers handle one error kind at
//! that boundary, without the underlying library error types leaking through.

use thiserror::Error;

/// Top-level error type for hub and adapter construction.
#[derive(Debug, Error)]
pub enum HubError {
    /// A provider adapter could not be built from its configuration record.
    ///
    /// Covers credential material that cannot be read or signed, TLS setup
    /// failures and refused initial connections. `detail` is a plain string
    /// on purpose: the concrete cause is logged, not re-exported.
    #[error("provider '{provider}' could not be instantiated: {detail}")]
    ProviderInstantiation { provider: String, detail: String },

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl HubError {
    /// Narrow an arbitrary construction failure to a provider instantiation error.
    pub fn provider_instantiation(provider: &str, detail: impl std::fmt::Display) -> Self {
        Self::ProviderInstantiation {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;
