// Zonekeeper - Port Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewall port model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Transport protocols firewalld accepts for port entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
    Dccp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
            Protocol::Dccp => "dccp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            "dccp" => Ok(Protocol::Dccp),
            other => Err(Error::invalid(format!(
                "Unknown protocol '{other}' (expected tcp, udp, sctp or dccp)"
            ))),
        }
    }
}

/// A port or port range paired with a protocol.
///
/// Equality is exact on both parts; `80` and `80-80` are different entries,
/// just as firewalld treats them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port {
    pub port: String,
    pub protocol: Protocol,
}

impl Port {
    /// Create a port without validating the port text.
    pub fn new(port: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            port: port.into(),
            protocol,
        }
    }

    /// Canonical `"port/protocol"` encoding, used as a set key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.port, self.protocol)
    }

    /// Parse user input such as `8080/tcp` or `6000-6010/udp`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (port, proto) = s
            .split_once('/')
            .ok_or_else(|| Error::invalid(format!("'{s}' is not of the form port/protocol")))?;
        let protocol = proto.trim().parse()?;
        let port = port.trim();
        validate_port_spec(port)?;
        Ok(Self::new(port, protocol))
    }

    /// Parse the two parts firewalld sends on the wire.
    pub fn from_wire(port: &str, protocol: &str) -> Result<Self> {
        Ok(Self::new(port, protocol.parse()?))
    }

    /// Get the well-known service name for this port.
    pub fn well_known_service(&self) -> Option<&'static str> {
        match (self.port.as_str(), self.protocol) {
            ("22", Protocol::Tcp) => Some("SSH"),
            ("80", Protocol::Tcp) => Some("HTTP"),
            ("443", Protocol::Tcp) => Some("HTTPS"),
            ("21", Protocol::Tcp) => Some("FTP"),
            ("25", Protocol::Tcp) => Some("SMTP"),
            ("53", Protocol::Tcp | Protocol::Udp) => Some("DNS"),
            ("67" | "68", Protocol::Udp) => Some("DHCP"),
            ("445", Protocol::Tcp) => Some("SMB"),
            ("3306", Protocol::Tcp) => Some("MySQL"),
            ("5432", Protocol::Tcp) => Some("PostgreSQL"),
            ("6379", Protocol::Tcp) => Some("Redis"),
            ("8080", Protocol::Tcp) => Some("HTTP Alt"),
            _ => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Validate a single port (`1`..=`65535`) or an ascending range `a-b`.
fn validate_port_spec(spec: &str) -> Result<()> {
    let number = |s: &str| -> Result<u16> {
        match s.parse::<u16>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(Error::invalid(format!("'{s}' is not a port number between 1 and 65535"))),
        }
    };

    match spec.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (number(start)?, number(end)?);
            if start > end {
                return Err(Error::invalid(format!("Port range {start}-{end} is reversed")));
            }
            Ok(())
        }
        None => number(spec).map(|_| ()),
    }
}

/// A port forward as reported in zone settings (read-only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPort {
    pub port: String,
    pub protocol: String,
    pub to_port: String,
    pub to_addr: String,
}

impl fmt::Display for ForwardPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} -> ", self.port, self.protocol)?;
        match (self.to_addr.is_empty(), self.to_port.is_empty()) {
            (true, _) => write!(f, ":{}", self.to_port),
            (false, true) => write!(f, "{}", self.to_addr),
            (false, false) => write!(f, "{}:{}", self.to_addr, self.to_port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_port_and_range() {
        assert_eq!(Port::parse("8080/tcp").unwrap(), Port::new("8080", Protocol::Tcp));
        assert_eq!(Port::parse(" 6000-6010/udp ").unwrap(), Port::new("6000-6010", Protocol::Udp));
        assert_eq!(Port::parse("9/sctp").unwrap().key(), "9/sctp");
    }

    #[test]
    fn test_parse_rejects_malformed_specs() {
        for bad in ["", "80", "80/icmp", "0/tcp", "70000/tcp", "90-80/tcp", "abc/udp", "/tcp"] {
            assert!(
                matches!(Port::parse(bad), Err(Error::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_equality_is_exact() {
        assert_ne!(Port::new("80", Protocol::Tcp), Port::new("80", Protocol::Udp));
        assert_ne!(Port::new("80", Protocol::Tcp), Port::new("80-80", Protocol::Tcp));
    }

    #[test]
    fn test_forward_port_display() {
        let fwd = ForwardPort {
            port: "80".into(),
            protocol: "tcp".into(),
            to_port: "8080".into(),
            to_addr: String::new(),
        };
        assert_eq!(fwd.to_string(), "80/tcp -> :8080");
    }
}
