//! Client signal encoding.
//!
//! A signal is a client network address normalized to 16 bytes. IPv6
//! addresses are taken as-is; IPv4 addresses are mapped into the
//! `::ffff:0:0/96` range (RFC 3493 §3.7).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError, SIGNAL_SIZE};

/// A 16-byte, IPv6-shaped client signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal([u8; SIGNAL_SIZE]);

impl Signal {
    /// Wrap raw signal bytes.
    pub const fn from_bytes(bytes: [u8; SIGNAL_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw signal bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNAL_SIZE] {
        &self.0
    }

    /// The address this signal encodes; IPv4-mapped signals come back as IPv4.
    pub fn to_ip(&self) -> IpAddr {
        let v6 = Ipv6Addr::from(self.0);
        match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        }
    }
}

impl From<Ipv6Addr> for Signal {
    fn from(addr: Ipv6Addr) -> Self {
        Self(addr.octets())
    }
}

impl From<Ipv4Addr> for Signal {
    fn from(addr: Ipv4Addr) -> Self {
        let mut bytes = [0u8; SIGNAL_SIZE];
        bytes[10] = 0xff;
        bytes[11] = 0xff;
        bytes[12..].copy_from_slice(&addr.octets());
        Self(bytes)
    }
}

impl From<IpAddr> for Signal {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({})", self.to_ip())
    }
}

/// Whether `address` is a syntactically valid IPv4 or IPv6 literal.
pub fn is_valid_address(address: &str) -> bool {
    address.parse::<Ipv6Addr>().is_ok() || address.parse::<Ipv4Addr>().is_ok()
}

/// Encode an address literal into its 16-byte signal.
///
/// # Errors
///
/// [`TypesError::InvalidAddress`] if `address` is neither form.
pub fn encode(address: &str) -> Result<Signal> {
    if let Ok(v6) = address.parse::<Ipv6Addr>() {
        return Ok(v6.into());
    }
    if let Ok(v4) = address.parse::<Ipv4Addr>() {
        return Ok(v4.into());
    }
    Err(TypesError::InvalidAddress(address.to_string()))
}
