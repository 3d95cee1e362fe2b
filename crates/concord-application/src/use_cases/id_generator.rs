//! Short identifier generation
//!
//! Ids are composed locally, without a store round trip:
//!
//! ```text
//! sub(3) pid(4) counter(4) "@" location(2) millis(11) host(4) port(2) "2"
//! ```
//!
//! `pid`, `counter`, `millis` and `host` are lowercase hex. Two ids from the
//! same process in the same millisecond differ by their counter, which is a
//! single atomic `u16` that wraps after 65 536 ids.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::Utc;
use concord_domain::constants::{
    DEFAULT_ID_SUB, ID_PORT_MIN_LEN, ID_PORT_PREFIX_LEN, ID_SUB_WIDTH, ID_TIMESTAMP_MASK,
    ID_VERSION_SUFFIX,
};
use concord_domain::error::{Error, Result};

/// Lock-free short id generator
#[derive(Debug)]
pub struct IdGenerator {
    location: String,
    pid: String,
    host: String,
    port: String,
    counter: AtomicU16,
}

impl IdGenerator {
    /// Build a generator for this process.
    ///
    /// `host_ip` must be an IPv4 address and `port` at least four
    /// characters long.
    pub fn new(location: impl Into<String>, host_ip: &str, port: &str) -> Result<Self> {
        let ip: Ipv4Addr = host_ip.trim().parse().map_err(|_| {
            Error::invalid_argument(format!("id generator host '{host_ip}' is not an IPv4 address"))
        })?;
        if port.chars().count() < ID_PORT_MIN_LEN {
            return Err(Error::invalid_argument(format!(
                "id generator port '{port}' must be at least {ID_PORT_MIN_LEN} characters"
            )));
        }

        let [_, _, o3, o4] = ip.octets();
        Ok(Self {
            location: location.into(),
            pid: format!("{:04x}", std::process::id() & 0xff),
            host: format!("{o3:02x}{o4:02x}"),
            port: port.chars().take(ID_PORT_PREFIX_LEN).collect(),
            counter: AtomicU16::new(0),
        })
    }

    /// Replace the process id segment
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = format!("{:04x}", pid & 0xff);
        self
    }

    /// Next id with the default `src` sub-identifier
    pub fn next(&self) -> String {
        self.next_with_sub("")
    }

    /// Next id with `sub` (truncated to three characters, right-aligned)
    pub fn next_with_sub(&self, sub: &str) -> String {
        let sub = if sub.is_empty() { DEFAULT_ID_SUB } else { sub };
        let sub: String = sub.chars().take(ID_SUB_WIDTH).collect();
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0) & ID_TIMESTAMP_MASK;

        format!(
            "{sub:>width$}{pid}{index:04x}@{location}{millis:011x}{host}{port}{ID_VERSION_SUFFIX}",
            width = ID_SUB_WIDTH,
            pid = self.pid,
            location = self.location,
            host = self.host,
            port = self.port,
        )
    }
}
