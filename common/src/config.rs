use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::channel::ChannelAddress;
use crate::error::ConfigError;
use crate::messaging::Credentials;

fn default_initial_delay_ms() -> u64 {
    PublisherConfig::INITIAL_DELAY.as_millis() as u64
}

fn default_publish_interval_ms() -> u64 {
    PublisherConfig::PUBLISH_INTERVAL.as_millis() as u64
}

/// Everything the publisher needs to know about its device and account.
#[derive(Deserialize, Clone, PartialEq)]
pub struct PublisherConfig {
    pub account_id: String,
    pub device_id: String,
    pub username: String,
    pub password: String,

    /// Delay before the first cycle. Longer than the interval so the login can finish.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// Published once on the pressure channel as soon as messaging is up.
    #[serde(default)]
    pub greeting: Option<String>,
}

impl core::fmt::Debug for PublisherConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PublisherConfig")
            .field("account_id", &self.account_id)
            .field("device_id", &self.device_id)
            .field("username", &self.username)
            .field("initial_delay_ms", &self.initial_delay_ms)
            .field("publish_interval_ms", &self.publish_interval_ms)
            .field("greeting", &self.greeting)
            .finish_non_exhaustive()
    }
}

impl PublisherConfig {
    pub const INITIAL_DELAY: Duration = Duration::from_secs(15);
    pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(2);

    pub fn new(account_id: &str, device_id: &str, username: &str, password: &str) -> Self {
        Self {
            account_id: account_id.into(),
            device_id: device_id.into(),
            username: username.into(),
            password: password.into(),
            initial_delay_ms: default_initial_delay_ms(),
            publish_interval_ms: default_publish_interval_ms(),
            greeting: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reads the `PUBLISHER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));
        let millis = |name: &'static str, default: u64| match lookup(name) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidVar { name, value }),
            None => Ok(default),
        };

        let config = Self {
            account_id: required("PUBLISHER_ACCOUNT_ID")?,
            device_id: required("PUBLISHER_DEVICE_ID")?,
            username: required("PUBLISHER_USERNAME")?,
            password: required("PUBLISHER_PASSWORD")?,
            initial_delay_ms: millis("PUBLISHER_INITIAL_DELAY_MS", default_initial_delay_ms())?,
            publish_interval_ms: millis("PUBLISHER_INTERVAL_MS", default_publish_interval_ms())?,
            greeting: lookup("PUBLISHER_GREETING"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the interval is positive and the initial delay is not shorter than it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_interval_ms == 0 || self.initial_delay_ms < self.publish_interval_ms {
            return Err(ConfigError::Timing {
                initial_delay_ms: self.initial_delay_ms,
                publish_interval_ms: self.publish_interval_ms,
            });
        }
        Ok(())
    }

    pub fn with_timing(mut self, initial_delay: Duration, publish_interval: Duration) -> Self {
        self.initial_delay_ms = initial_delay.as_millis() as u64;
        self.publish_interval_ms = publish_interval.as_millis() as u64;
        self
    }

    pub fn with_greeting(mut self, greeting: &str) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            account_id: self.account_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn channels(&self) -> ChannelAddress {
        ChannelAddress::new(&self.account_id, &self.device_id)
    }
}
