use std::net::{SocketAddr, UdpSocket};

use sensor_publisher_common::ConnectivityProbe;

/// Checks for a usable default route. Connecting a UDP socket only resolves the route, no
/// packet leaves the host.
pub struct RouteProbe {
    target: SocketAddr,
}

impl RouteProbe {
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }
}

impl Default for RouteProbe {
    fn default() -> Self {
        Self::new(SocketAddr::from(([8, 8, 8, 8], 53)))
    }
}

impl ConnectivityProbe for RouteProbe {
    fn active_network_reachable(&self) -> std::io::Result<bool> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(self.target)?;

        Ok(!socket.local_addr()?.ip().is_loopback())
    }
}

#[test]
fn test_loopback_target_is_not_a_network() {
    let probe = RouteProbe::new(SocketAddr::from(([127, 0, 0, 1], 9)));
    assert!(!probe.active_network_reachable().unwrap());
}
