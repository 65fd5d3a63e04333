use crate::sensor::QuantityKind;

/// Prefix of every device channel.
pub const CHANNEL_NAMESPACE: &str = "xi/blue/v1";

/// Channel names for one device, fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelAddress {
    temperature: String,
    pressure: String,
}

impl ChannelAddress {
    pub fn new(account_id: &str, device_id: &str) -> Self {
        let channel = |kind: QuantityKind| {
            format!("{CHANNEL_NAMESPACE}/{account_id}/d/{device_id}/{}", kind.as_str())
        };

        Self {
            temperature: channel(QuantityKind::Temperature),
            pressure: channel(QuantityKind::Pressure),
        }
    }

    pub fn for_kind(&self, kind: QuantityKind) -> &str {
        match kind {
            QuantityKind::Temperature => &self.temperature,
            QuantityKind::Pressure => &self.pressure,
        }
    }
}

#[test]
fn test_channel_names() {
    let channels = ChannelAddress::new("acc-1", "dev-7");
    assert_eq!(
        channels.for_kind(QuantityKind::Temperature),
        "xi/blue/v1/acc-1/d/dev-7/temperature"
    );
    assert_eq!(
        channels.for_kind(QuantityKind::Pressure),
        "xi/blue/v1/acc-1/d/dev-7/pressure"
    );
}
