//! Local host address

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

use tracing::{debug, warn};

/// First non-loopback IPv4 address the local hostname resolves to.
///
/// Falls back to `127.0.0.1` when the hostname cannot be read or resolved.
/// Resolution is blocking; call it once at startup.
pub fn local_ipv4() -> Ipv4Addr {
    let name = match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, "could not read hostname, using loopback for ids");
            return Ipv4Addr::LOCALHOST;
        }
    };

    let resolved = (name.as_str(), 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| {
            addrs.find_map(|addr| match addr.ip() {
                IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
                _ => None,
            })
        });

    match resolved {
        Some(ip) => {
            debug!(host = %name, %ip, "resolved local address");
            ip
        }
        None => {
            warn!(host = %name, "no IPv4 address for hostname, using loopback for ids");
            Ipv4Addr::LOCALHOST
        }
    }
}
