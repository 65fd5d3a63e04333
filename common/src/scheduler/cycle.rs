// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use log::{debug, error, warn};

use crate::channel::ChannelAddress;
use crate::connectivity::ConnectionGate;
use crate::messaging::{MessagingClient, QoS};
use crate::payload::{build_envelope, MessageEnvelope};
use crate::sensor::{QuantityKind, SensorCache};

/// What a single cycle ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The connection gate said no.
    Offline,
    /// No messaging channel yet.
    NotReady,
    NothingToPublish,
    SerializationFailed,
    Published { attempted: usize, delivered: usize },
}

/// One sample-and-publish pass over all quantity kinds.
pub struct PublishCycle {
    device_id: String,
    channels: ChannelAddress,
    cache: SensorCache,
    gate: ConnectionGate,
}

impl PublishCycle {
    pub fn new(
        device_id: &str,
        channels: ChannelAddress,
        cache: SensorCache,
        gate: ConnectionGate,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            channels,
            cache,
            gate,
        }
    }

    pub fn channels(&self) -> &ChannelAddress {
        &self.channels
    }

    fn envelope(&self, kind: QuantityKind, now_ms: i64) -> MessageEnvelope {
        let sample = self.cache.read_sample(kind);
        if sample.is_some_and(f32::is_nan) {
            warn!("Ignoring invalid {kind} reading: NaN");
        }

        build_envelope(kind, sample, &self.device_id, now_ms)
    }

    /// Runs the cycle. Every failure is logged here and reflected in the outcome only.
    pub fn run(&self, messaging: Option<&dyn MessagingClient>, now_ms: i64) -> CycleOutcome {
        if !self.gate.is_reachable() {
            warn!("No active network");
            return CycleOutcome::Offline;
        }

        let Some(messaging) = messaging else {
            warn!("Messaging connection not established");
            return CycleOutcome::NotReady;
        };

        let envelopes = QuantityKind::ALL.map(|kind| (kind, self.envelope(kind, now_ms)));

        if envelopes.iter().all(|(_, envelope)| !envelope.has_data()) {
            debug!("No sensor measurement to publish");
            return CycleOutcome::NothingToPublish;
        }

        // Everything is serialized before the first publish; one failure drops the cycle.
        let messages = envelopes
            .iter()
            .filter(|(_, envelope)| envelope.has_data())
            .map(|(kind, envelope)| envelope.to_bytes().map(|payload| (*kind, payload)))
            .collect::<Result<Vec<_>, _>>();

        let messages = match messages {
            Ok(messages) => messages,
            Err(e) => {
                error!("Error serializing message payload: {e}");
                return CycleOutcome::SerializationFailed;
            }
        };

        let mut delivered = 0;
        for (kind, payload) in &messages {
            let channel = self.channels.for_kind(*kind);
            match messaging.publish(channel, payload, QoS::AtLeastOnce) {
                Ok(()) => {
                    debug!("Published on {channel}: {}", String::from_utf8_lossy(payload));
                    delivered += 1;
                }
                Err(e) => warn!("Failed to publish {kind} data: {e}"),
            }
        }

        CycleOutcome::Published {
            attempted: messages.len(),
            delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::StaticProbe;
    use crate::messaging::{CloudService, Credentials, DummyCloudService};

    const NOW: i64 = 1_485_000_000_000;

    fn cycle(cache: &SensorCache, probe: StaticProbe) -> PublishCycle {
        PublishCycle::new(
            "station-1",
            ChannelAddress::new("acc", "station-1"),
            cache.clone(),
            ConnectionGate::new(Box::new(probe)),
        )
    }

    async fn connect(service: &DummyCloudService) -> Box<dyn MessagingClient> {
        let credentials = Credentials {
            account_id: "acc".into(),
            username: "user".into(),
            password: "secret".into(),
        };

        service
            .authenticate(&credentials)
            .await
            .unwrap()
            .request_messaging()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_offline_publishes_nothing() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, 20.0);

        for probe in [StaticProbe::Unreachable, StaticProbe::Failing] {
            let outcome = cycle(&cache, probe).run(Some(messaging.as_ref()), NOW);
            assert_eq!(outcome, CycleOutcome::Offline);
        }
        assert!(service.published().is_empty());
    }

    #[test]
    fn test_without_messaging() {
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, 20.0);

        let outcome = cycle(&cache, StaticProbe::Reachable).run(None, NOW);
        assert_eq!(outcome, CycleOutcome::NotReady);
    }

    #[tokio::test]
    async fn test_nothing_to_publish() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        let cache = SensorCache::new();

        let cycle = cycle(&cache, StaticProbe::Reachable);
        assert_eq!(cycle.run(Some(messaging.as_ref()), NOW), CycleOutcome::NothingToPublish);

        cache.record_sample(QuantityKind::Pressure, f32::NAN);
        assert_eq!(cycle.run(Some(messaging.as_ref()), NOW), CycleOutcome::NothingToPublish);

        assert!(service.published().is_empty());
    }

    #[tokio::test]
    async fn test_temperature_only() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, 21.5);

        let outcome = cycle(&cache, StaticProbe::Reachable).run(Some(messaging.as_ref()), NOW);
        assert_eq!(outcome, CycleOutcome::Published { attempted: 1, delivered: 1 });

        let published = service.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].channel, "xi/blue/v1/acc/d/station-1/temperature");
        assert_eq!(published[0].qos, QoS::AtLeastOnce);
        assert_eq!(
            published[0].payload_json().unwrap(),
            serde_json::json!({
                "deviceId": "station-1",
                "timestamp": NOW,
                "data": {"temperature": "21.5"}
            })
        );
    }

    #[tokio::test]
    async fn test_pressure_only() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Pressure, 1013.2);

        cycle(&cache, StaticProbe::Reachable).run(Some(messaging.as_ref()), NOW);

        assert!(service
            .published_on("xi/blue/v1/acc/d/station-1/temperature")
            .is_empty());
        let pressure = service.published_on("xi/blue/v1/acc/d/station-1/pressure");
        assert_eq!(pressure.len(), 1);
        assert_eq!(pressure[0].payload_json().unwrap()["data"]["pressure"], "1013.2");
    }

    #[tokio::test]
    async fn test_failed_publish_does_not_stop_the_other() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        service.fail_channel("xi/blue/v1/acc/d/station-1/temperature");

        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, 19.0);
        cache.record_sample(QuantityKind::Pressure, 998.5);

        let outcome = cycle(&cache, StaticProbe::Reachable).run(Some(messaging.as_ref()), NOW);
        assert_eq!(outcome, CycleOutcome::Published { attempted: 2, delivered: 1 });

        let published = service.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].channel, "xi/blue/v1/acc/d/station-1/pressure");
    }

    #[tokio::test]
    async fn test_infinite_reading_is_published() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, f32::INFINITY);

        let outcome = cycle(&cache, StaticProbe::Reachable).run(Some(messaging.as_ref()), NOW);
        assert_eq!(outcome, CycleOutcome::Published { attempted: 1, delivered: 1 });

        let published = service.published_on("xi/blue/v1/acc/d/station-1/temperature");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].payload_json().unwrap()["data"]["temperature"], "Infinity");
    }

    #[tokio::test]
    async fn test_disconnected_client() {
        let service = DummyCloudService::new();
        let messaging = connect(&service).await;
        service.set_connected(false);

        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, 19.0);
        cache.record_sample(QuantityKind::Pressure, 998.5);

        let outcome = cycle(&cache, StaticProbe::Reachable).run(Some(messaging.as_ref()), NOW);
        assert_eq!(outcome, CycleOutcome::Published { attempted: 2, delivered: 0 });
    }
}
