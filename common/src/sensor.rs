use core::sync::atomic::Ordering;
use std::sync::Arc;

use portable_atomic::AtomicU64;

/// The sensor dimension being reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuantityKind {
    Temperature,
    Pressure,
}

impl QuantityKind {
    /// All monitored kinds, in publish order.
    pub const ALL: [QuantityKind; 2] = [QuantityKind::Temperature, QuantityKind::Pressure];

    /// The name used on the wire, both as channel suffix and as `data` key.
    pub fn as_str(self) -> &'static str {
        match self {
            QuantityKind::Temperature => "temperature",
            QuantityKind::Pressure => "pressure",
        }
    }

    fn slot(self) -> usize {
        match self {
            QuantityKind::Temperature => 0,
            QuantityKind::Pressure => 1,
        }
    }
}

impl core::fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Bit 32 marks a present sample, the low 32 bits hold the f32.
const PRESENT: u64 = 1 << 32;

fn pack(value: Option<f32>) -> u64 {
    match value {
        Some(v) => PRESENT | u64::from(v.to_bits()),
        None => 0,
    }
}

fn unpack(word: u64) -> Option<f32> {
    (word & PRESENT != 0).then(|| f32::from_bits(word as u32))
}

/// Latest observed value per quantity kind.
///
/// Each slot is a single atomic word, so the sensor delivery thread can write while the
/// publisher reads without locking. A NaN that was actually recorded is kept and stays
/// distinguishable from "never recorded".
#[derive(Clone, Default)]
pub struct SensorCache(Arc<[AtomicU64; 2]>);

impl SensorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored value for `kind`.
    pub fn record_sample(&self, kind: QuantityKind, value: f32) {
        self.0[kind.slot()].store(pack(Some(value)), Ordering::Release);
    }

    /// Returns the most recently recorded value, or `None` if nothing was recorded yet.
    pub fn read_sample(&self, kind: QuantityKind) -> Option<f32> {
        unpack(self.0[kind.slot()].load(Ordering::Acquire))
    }

    /// Forgets the value for `kind`.
    pub fn clear(&self, kind: QuantityKind) {
        self.0[kind.slot()].store(pack(None), Ordering::Release);
    }

    /// A listener that feeds sensor events for `kind` into this cache.
    pub fn listener(&self, kind: QuantityKind) -> SensorListener {
        SensorListener {
            cache: self.clone(),
            kind,
        }
    }
}

/// Handed to a sensor source; records the first value of every event it receives.
#[derive(Clone)]
pub struct SensorListener {
    cache: SensorCache,
    kind: QuantityKind,
}

impl SensorListener {
    pub fn kind(&self) -> QuantityKind {
        self.kind
    }

    pub fn on_sensor_changed(&self, values: &[f32]) {
        if let Some(&value) = values.first() {
            self.cache.record_sample(self.kind, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecorded_sample_is_absent() {
        let cache = SensorCache::new();
        assert_eq!(cache.read_sample(QuantityKind::Temperature), None);
        assert_eq!(cache.read_sample(QuantityKind::Pressure), None);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = SensorCache::new();
        for value in [1.0, -40.25, 0.0, 21.5] {
            cache.record_sample(QuantityKind::Temperature, value);
            assert_eq!(cache.read_sample(QuantityKind::Temperature), Some(value));
        }
        assert_eq!(cache.read_sample(QuantityKind::Pressure), None);
    }

    #[test]
    fn test_recorded_nan_is_not_absent() {
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Pressure, f32::NAN);
        assert!(cache.read_sample(QuantityKind::Pressure).unwrap().is_nan());

        cache.clear(QuantityKind::Pressure);
        assert_eq!(cache.read_sample(QuantityKind::Pressure), None);
    }

    #[test]
    fn test_zero_is_present() {
        let cache = SensorCache::new();
        cache.record_sample(QuantityKind::Temperature, 0.0);
        assert_eq!(cache.read_sample(QuantityKind::Temperature), Some(0.0));
    }

    #[test]
    fn test_listener_records_first_value() {
        let cache = SensorCache::new();
        let listener = cache.listener(QuantityKind::Pressure);

        listener.on_sensor_changed(&[]);
        assert_eq!(cache.read_sample(QuantityKind::Pressure), None);

        listener.on_sensor_changed(&[1013.2, 5.0]);
        assert_eq!(cache.read_sample(QuantityKind::Pressure), Some(1013.2));
        assert_eq!(cache.read_sample(QuantityKind::Temperature), None);
    }

    #[test]
    fn test_concurrent_writer() {
        let cache = SensorCache::new();
        let writer = cache.listener(QuantityKind::Temperature);

        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                writer.on_sensor_changed(&[i as f32]);
            }
        });

        while !handle.is_finished() {
            if let Some(value) = cache.read_sample(QuantityKind::Temperature) {
                assert!((0.0..1000.0).contains(&value));
            }
        }
        handle.join().unwrap();

        assert_eq!(cache.read_sample(QuantityKind::Temperature), Some(999.0));
    }
}
