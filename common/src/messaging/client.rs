// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::error::PublishError;

/// Delivery guarantee requested from the messaging client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QoS {
    AtMostOnce,
    /// Duplicates are possible, loss is not.
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// The login used for the cloud session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Entry point of the cloud SDK: turns credentials into a session.
#[async_trait]
pub trait CloudService: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn CloudSession>, PublishError>;
}

/// An authenticated session, able to hand out a messaging channel.
#[async_trait]
pub trait CloudSession: Send + Sync {
    async fn request_messaging(&self) -> Result<Box<dyn MessagingClient>, PublishError>;
}

/// The pub/sub channel. Publishing is fire-and-forget from the caller's view; the client
/// does its own I/O.
pub trait MessagingClient: Send {
    fn publish(&self, channel: &str, payload: &[u8], qos: QoS) -> Result<(), PublishError>;
}

#[test]
fn test_credentials_debug_hides_password() {
    let credentials = Credentials {
        account_id: "acc".into(),
        username: "user".into(),
        password: "hunter2".into(),
    };

    let text = format!("{credentials:?}");
    assert!(text.contains("user"));
    assert!(!text.contains("hunter2"));
}
