/// Asks the host networking layer whether an active network is up.
pub trait ConnectivityProbe: Send {
    fn active_network_reachable(&self) -> std::io::Result<bool>;
}

/// Publishing only happens when this says the network is reachable.
pub struct ConnectionGate {
    probe: Box<dyn ConnectivityProbe>,
}

impl ConnectionGate {
    pub fn new(probe: Box<dyn ConnectivityProbe>) -> Self {
        Self { probe }
    }

    /// One query per call. A failing query counts as unreachable.
    pub fn is_reachable(&self) -> bool {
        match self.probe.active_network_reachable() {
            Ok(reachable) => reachable,
            Err(e) => {
                log::warn!("Connectivity query failed: {e}");
                false
            }
        }
    }
}

/// A probe with a fixed answer. Useful on hosts without a network stack and in tests.
#[derive(Clone, Copy, Debug)]
pub enum StaticProbe {
    Reachable,
    Unreachable,
    Failing,
}

impl ConnectivityProbe for StaticProbe {
    fn active_network_reachable(&self) -> std::io::Result<bool> {
        match self {
            StaticProbe::Reachable => Ok(true),
            StaticProbe::Unreachable => Ok(false),
            StaticProbe::Failing => Err(std::io::Error::other("network service unavailable")),
        }
    }
}

#[test]
fn test_failing_probe_is_unreachable() {
    assert!(ConnectionGate::new(Box::new(StaticProbe::Reachable)).is_reachable());
    assert!(!ConnectionGate::new(Box::new(StaticProbe::Unreachable)).is_reachable());
    assert!(!ConnectionGate::new(Box::new(StaticProbe::Failing)).is_reachable());
}
