use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use sensor_publisher_common::{QuantityKind, SensorListener};

/// A made-up sensor drifting slowly around a base value.
pub struct SimulatedSensor {
    base: f32,
    amplitude: f32,
    step: u32,
}

impl SimulatedSensor {
    pub fn for_kind(kind: QuantityKind) -> Self {
        match kind {
            QuantityKind::Temperature => Self::new(21.5, 1.5),
            QuantityKind::Pressure => Self::new(1013.2, 4.0),
        }
    }

    pub fn new(base: f32, amplitude: f32) -> Self {
        Self {
            base,
            amplitude,
            step: 0,
        }
    }

    pub fn read(&mut self) -> f32 {
        let phase = self.step as f32 * 0.1;
        self.step = self.step.wrapping_add(1);

        let value = self.base + self.amplitude * phase.sin();
        // One decimal, like a real station reports.
        (value * 10.0).round() / 10.0
    }
}

/// A sensor thread feeding its listener until stopped.
pub struct SensorFeed {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SensorFeed {
    pub fn spawn(
        mut sensor: SimulatedSensor,
        listener: SensorListener,
        period: Duration,
    ) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name(format!("{}-sensor", listener.kind()))
            .spawn(move || loop {
                let value = sensor.read();
                log::debug!("{}: {value}", listener.kind());
                listener.on_sensor_changed(&[value]);

                match stopped.recv_timeout(period) {
                    Err(mpsc::RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            })?;

        Ok(Self { stop, handle })
    }

    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::error!("Sensor thread panicked");
        }
    }
}

#[test]
fn test_simulated_sensor_stays_near_base() {
    let mut sensor = SimulatedSensor::for_kind(QuantityKind::Pressure);
    for _ in 0..100 {
        let value = sensor.read();
        assert!((1009.0..=1017.5).contains(&value), "{value}");
    }
}

#[test]
fn test_feed_records_into_cache() {
    let cache = sensor_publisher_common::SensorCache::new();
    let feed = SensorFeed::spawn(
        SimulatedSensor::new(20.0, 0.0),
        cache.listener(QuantityKind::Temperature),
        Duration::from_millis(5),
    )
    .unwrap();

    let give_up = std::time::Instant::now() + Duration::from_secs(5);
    while cache.read_sample(QuantityKind::Temperature).is_none() {
        assert!(std::time::Instant::now() < give_up);
        std::thread::sleep(Duration::from_millis(5));
    }
    feed.stop();

    assert_eq!(cache.read_sample(QuantityKind::Temperature), Some(20.0));
}
