//! The JSON envelope sent for every published sample.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sensor::QuantityKind;

/// `{"deviceId": ..., "timestamp": ..., "data": {"<kind>": "<value>"}}`
///
/// `data` is left out entirely when there is no usable sample.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub device_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

impl MessageEnvelope {
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Text of a sample value: the shortest decimal that reads back as the same `f32`, and
/// `Infinity` / `-Infinity` for the infinities.
fn value_text(value: f32) -> String {
    if value == f32::INFINITY {
        "Infinity".to_string()
    } else if value == f32::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        value.to_string()
    }
}

/// Builds the envelope for one quantity.
///
/// Absent samples and NaN produce an envelope without `data`.
pub fn build_envelope(
    kind: QuantityKind,
    sample: Option<f32>,
    device_id: &str,
    now_ms: i64,
) -> MessageEnvelope {
    let data = sample.filter(|value| !value.is_nan()).map(|value| {
        let mut data = BTreeMap::new();
        data.insert(kind.as_str().to_string(), value_text(value));
        data
    });

    MessageEnvelope {
        device_id: device_id.to_string(),
        timestamp: now_ms,
        data,
    }
}

#[test]
fn test_absent_sample_has_no_data() {
    for kind in QuantityKind::ALL {
        let envelope = build_envelope(kind, None, "device-1", 1_700_000_000_000);
        assert!(!envelope.has_data());

        let json: serde_json::Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"deviceId": "device-1", "timestamp": 1_700_000_000_000_i64})
        );
    }
}

#[test]
fn test_present_sample_is_stringified() {
    let envelope = build_envelope(QuantityKind::Temperature, Some(21.5), "device-1", 42);
    let bytes = envelope.to_bytes().unwrap();

    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        r#"{"deviceId":"device-1","timestamp":42,"data":{"temperature":"21.5"}}"#
    );
}

#[test]
fn test_value_text_reads_back_exactly() {
    for value in [1013.2_f32, -0.1, 1e-7, 123456.79, 0.0] {
        let envelope = build_envelope(QuantityKind::Pressure, Some(value), "d", 0);
        let text = &envelope.data.unwrap()["pressure"];
        assert_eq!(text.parse::<f32>().unwrap(), value);
    }
}

#[test]
fn test_nan_sample_has_no_data() {
    let envelope = build_envelope(QuantityKind::Pressure, Some(f32::NAN), "d", 0);
    assert!(!envelope.has_data());
}

#[test]
fn test_infinite_sample_is_published() {
    let envelope = build_envelope(QuantityKind::Pressure, Some(f32::INFINITY), "d", 0);
    assert_eq!(envelope.data.unwrap()["pressure"], "Infinity");

    let envelope = build_envelope(QuantityKind::Temperature, Some(f32::NEG_INFINITY), "d", 0);
    assert_eq!(envelope.data.unwrap()["temperature"], "-Infinity");
}

#[test]
fn test_whole_number_text() {
    let envelope = build_envelope(QuantityKind::Temperature, Some(21.0), "d", 0);
    assert_eq!(envelope.data.unwrap()["temperature"], "21");
}
