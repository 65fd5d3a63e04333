// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PublishError;
use crate::messaging::client::{CloudService, CloudSession, Credentials, MessagingClient, QoS};

/// A message that went through a [`DummyCloudService`].
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedMessage {
    pub channel: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl PublishedMessage {
    pub fn payload_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Behavior {
    Online,
    RejectCredentials,
    NoMessaging,
}

#[derive(Default)]
struct Shared {
    published: Vec<PublishedMessage>,
    failing_channels: HashSet<String>,
    connected: bool,
}

/// An in-process cloud that logs and records every publish instead of sending it.
///
/// Clones share the same record, so a test can keep one and hand the other to the
/// scheduler.
#[derive(Clone)]
pub struct DummyCloudService {
    behavior: Behavior,
    auth_delay: Duration,
    publish_delay: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl Default for DummyCloudService {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyCloudService {
    pub fn new() -> Self {
        Self {
            behavior: Behavior::Online,
            auth_delay: Duration::ZERO,
            publish_delay: Duration::ZERO,
            shared: Arc::new(Mutex::new(Shared {
                connected: true,
                ..Default::default()
            })),
        }
    }

    /// Every authentication attempt fails.
    pub fn rejecting_credentials() -> Self {
        Self {
            behavior: Behavior::RejectCredentials,
            ..Self::new()
        }
    }

    /// Authentication works but the messaging channel is never created.
    pub fn without_messaging() -> Self {
        Self {
            behavior: Behavior::NoMessaging,
            ..Self::new()
        }
    }

    /// Delays the authentication handshake.
    pub fn with_auth_delay(mut self, delay: Duration) -> Self {
        self.auth_delay = delay;
        self
    }

    /// Blocks the calling thread for `delay` on every publish, like a slow transport.
    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }

    /// Makes every publish on `channel` fail with a transport error.
    pub fn fail_channel(&self, channel: &str) {
        self.shared.lock().unwrap().failing_channels.insert(channel.to_string());
    }

    /// Simulates a dropped connection: publishes fail with `NotConnected`.
    pub fn set_connected(&self, connected: bool) {
        self.shared.lock().unwrap().connected = connected;
    }

    /// All messages published so far.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.shared.lock().unwrap().published.clone()
    }

    pub fn published_on(&self, channel: &str) -> Vec<PublishedMessage> {
        self.published()
            .into_iter()
            .filter(|message| message.channel == channel)
            .collect()
    }
}

#[async_trait]
impl CloudService for DummyCloudService {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn CloudSession>, PublishError> {
        if !self.auth_delay.is_zero() {
            tokio::time::sleep(self.auth_delay).await;
        }

        match self.behavior {
            Behavior::RejectCredentials => Err(PublishError::AuthenticationFailed(format!(
                "credentials rejected for {}",
                credentials.username
            ))),
            Behavior::Online | Behavior::NoMessaging => {
                log::debug!("Dummy session created for {}", credentials.account_id);
                Ok(Box::new(DummySession {
                    service: self.clone(),
                }))
            }
        }
    }
}

struct DummySession {
    service: DummyCloudService,
}

#[async_trait]
impl CloudSession for DummySession {
    async fn request_messaging(&self) -> Result<Box<dyn MessagingClient>, PublishError> {
        match self.service.behavior {
            Behavior::NoMessaging => Err(PublishError::MessagingUnavailable(
                "dummy messaging disabled".into(),
            )),
            _ => Ok(Box::new(DummyMessaging {
                publish_delay: self.service.publish_delay,
                shared: self.service.shared.clone(),
            })),
        }
    }
}

struct DummyMessaging {
    publish_delay: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl MessagingClient for DummyMessaging {
    fn publish(&self, channel: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError> {
        if !self.publish_delay.is_zero() {
            std::thread::sleep(self.publish_delay);
        }

        let mut shared = self.shared.lock().unwrap();

        if !shared.connected {
            return Err(PublishError::NotConnected);
        }
        if shared.failing_channels.contains(channel) {
            return Err(PublishError::Transport(format!("publish on {channel} rejected")));
        }

        log::info!("{channel} <- {}", String::from_utf8_lossy(payload));
        shared.published.push(PublishedMessage {
            channel: channel.to_string(),
            payload: payload.to_vec(),
            qos,
        });

        Ok(())
    }
}
