use std::{
    fmt,
    net::{AddrParseError, IpAddr},
    num::ParseIntError,
    str::FromStr,
};

/// An actor endpoint: an `(ip, port, name)` triple addressing a process on
/// the wire-level actor runtime (the master, a slave, or our own scheduler
/// process). Comparable by value and round-trippable through its canonical
/// `ip:port/name` string form.
#[derive(Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    pub ip: IpAddr,
    pub port: u16,
    pub name: String,
}

impl Address {
    pub fn new(ip: IpAddr, port: u16, name: impl Into<String>) -> Self {
        Self {
            ip,
            port,
            name: name.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.ip, self.port, self.name)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AddressParseError(#[from] AddressParseErrorKind);

#[derive(Debug, thiserror::Error)]
enum AddressParseErrorKind {
    #[error("address `{0}` is missing the `/name` suffix")]
    MissingName(String),
    #[error("address is missing the `:port` separator")]
    MissingPort,
    #[error("failed parsing port")]
    Port(#[from] ParseIntError),
    #[error("failed parsing ip")]
    Ip(#[from] AddrParseError),
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parses the canonical `ip:port/name` form, e.g. `10.0.0.1:5050/master@`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host_port, name) = s
            .split_once('/')
            .ok_or_else(|| AddressParseErrorKind::MissingName(s.to_owned()))?;
        let (ip, port) = host_port
            .rsplit_once(':')
            .ok_or(AddressParseErrorKind::MissingPort)?;
        let ip: IpAddr = ip.parse().map_err(AddressParseErrorKind::Ip)?;
        let port: u16 = port.parse().map_err(AddressParseErrorKind::Port)?;
        Ok(Address::new(ip, port, name))
    }
}
