use crate::endpoint::Endpoint;
use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::time::Duration;

/// HTTP basic auth credentials, required by storage providers' stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network entrypoint the discovery endpoint is resolved against.
    pub network_url: String,
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    #[serde(with = "secs")]
    pub probe_timeout: Duration,
    #[serde(with = "secs")]
    pub confirmation_timeout: Duration,
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    pub storage_credentials: Option<BasicAuth>,
    pub storage_sc_address: String,
    pub storage_page_size: usize,
    pub require_storage_providers: bool,
}

pub const DEFAULT_STORAGE_SC_ADDRESS: &str =
    "6dba10422e368813802877a85039d3985d96760ed844092319743fb3a76712d7";

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network_url: String::new(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(2 * 60), // 2 minutes
            poll_interval: Duration::from_secs(1),
            storage_credentials: None,
            storage_sc_address: DEFAULT_STORAGE_SC_ADDRESS.to_string(),
            storage_page_size: 20,
            require_storage_providers: true,
        }
    }
}

impl ClientConfig {
    pub fn new(network_url: impl Into<String>) -> Self {
        Self {
            network_url: network_url.into(),
            ..Default::default()
        }
    }

    /// Parses a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_storage_credentials(mut self, credentials: BasicAuth) -> Self {
        self.storage_credentials = Some(credentials);
        self
    }

    pub fn with_storage_sc_address(mut self, address: impl Into<String>) -> Self {
        self.storage_sc_address = address.into();
        self
    }

    pub fn with_storage_page_size(mut self, size: usize) -> Self {
        self.storage_page_size = size;
        self
    }

    pub fn with_require_storage_providers(mut self, require: bool) -> Self {
        self.require_storage_providers = require;
        self
    }

    pub fn network_endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.network_url)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "network URL is required".into(),
            ));
        }

        self.network_endpoint()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        for (name, value) in [
            ("request timeout", self.request_timeout),
            ("probe timeout", self.probe_timeout),
            ("confirmation timeout", self.confirmation_timeout),
            ("poll interval", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(ClientError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if self.poll_interval > self.confirmation_timeout {
            return Err(ClientError::InvalidConfig(format!(
                "poll interval ({:?}) cannot exceed confirmation timeout ({:?})",
                self.poll_interval, self.confirmation_timeout
            )));
        }

        if self.storage_page_size == 0 {
            return Err(ClientError::InvalidConfig(
                "storage page size must be at least 1".into(),
            ));
        }

        if self.storage_sc_address.is_empty() {
            return Err(ClientError::InvalidConfig(
                "storage smart contract address is required".into(),
            ));
        }

        Ok(())
    }
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
