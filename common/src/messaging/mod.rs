// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

mod client;
mod dummy;

pub use client::{CloudService, CloudSession, Credentials, MessagingClient, QoS};

pub use dummy::{DummyCloudService, PublishedMessage};
