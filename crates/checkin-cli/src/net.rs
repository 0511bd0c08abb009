//! Host address shown on the display at startup.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use tracing::debug;

/// Shown when no routable address is found.
pub const ADDRESS_UNKNOWN: &str = "IP Not Found";

/// Any routable address works; connecting a UDP socket sends nothing.
const PROBE_TARGET: ([u8; 4], u16) = ([8, 8, 8, 8], 80);

/// Address of the interface that routes towards `target`.
pub fn route_address(target: SocketAddr) -> Option<IpAddr> {
    let bind: SocketAddr = match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    };
    let socket = UdpSocket::bind(bind).ok()?;
    if let Err(e) = socket.connect(target) {
        debug!(target = %target, error = %e, "No route for address probe");
        return None;
    }
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// Primary address of this host as display text.
pub fn host_address() -> String {
    route_address(SocketAddr::from(PROBE_TARGET))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| ADDRESS_UNKNOWN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_route() {
        let ip = route_address(SocketAddr::from(([127, 0, 0, 1], 9))).unwrap();
        assert!(ip.is_loopback());
    }

    #[test]
    fn test_host_address_is_displayable() {
        let text = host_address();
        assert!(text == ADDRESS_UNKNOWN || text.parse::<IpAddr>().is_ok());
    }
}
