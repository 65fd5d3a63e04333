//! Periodic sensor telemetry publisher.
//!
//! Sensor values land in a [`SensorCache`]; a [`PublishScheduler`] samples the cache on a
//! timer, wraps every present value in a JSON [`MessageEnvelope`] and hands it to a
//! [`MessagingClient`] obtained from a [`CloudService`] login.

mod channel;
mod config;
mod connectivity;
mod error;
mod payload;
mod sensor;

pub mod messaging;
pub mod scheduler;

pub use channel::{ChannelAddress, CHANNEL_NAMESPACE};
pub use config::PublisherConfig;
pub use connectivity::{ConnectionGate, ConnectivityProbe, StaticProbe};
pub use error::{ConfigError, PublishError};
pub use payload::{build_envelope, MessageEnvelope};
pub use sensor::{QuantityKind, SensorCache, SensorListener};

pub use messaging::{
    CloudService, CloudSession, Credentials, DummyCloudService, MessagingClient, PublishedMessage,
    QoS,
};
pub use scheduler::{CycleOutcome, PublishCycle, PublishScheduler, SchedulerState};
