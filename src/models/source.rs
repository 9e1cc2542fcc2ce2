// Zonekeeper - Source Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Zone source specifiers.

use std::fmt;
use std::net::IpAddr;

use crate::error::{Error, Result};

const IPSET_PREFIX: &str = "ipset:";

/// A zone source: an address or network, a MAC address, or a named set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Address(String),
    Mac(String),
    IpSet(String),
}

impl Source {
    /// Classify a source string as firewalld reports it. Never fails.
    pub fn from_wire(s: &str) -> Self {
        if let Some(name) = s.strip_prefix(IPSET_PREFIX) {
            Source::IpSet(name.to_string())
        } else if is_mac(s) {
            Source::Mac(s.to_ascii_uppercase())
        } else {
            Source::Address(s.to_string())
        }
    }

    /// Parse and validate user input.
    ///
    /// Accepts `ipset:<name>`, `mac:<addr>` or a bare MAC address, and IPv4/IPv6
    /// addresses with an optional prefix length.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid("Source must not be empty"));
        }
        if let Some(name) = s.strip_prefix(IPSET_PREFIX) {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::invalid(format!("'{s}' is not a valid ipset reference")));
            }
            return Ok(Source::IpSet(name.to_string()));
        }
        let mac = s.strip_prefix("mac:").unwrap_or(s);
        if is_mac(mac) {
            return Ok(Source::Mac(mac.to_ascii_uppercase()));
        }
        if s.starts_with("mac:") {
            return Err(Error::invalid(format!("'{mac}' is not a MAC address")));
        }
        validate_network(s)?;
        Ok(Source::Address(s.to_string()))
    }

    /// The string firewalld expects for add/remove calls.
    pub fn to_wire(&self) -> String {
        match self {
            Source::Address(a) => a.clone(),
            Source::Mac(m) => m.clone(),
            Source::IpSet(n) => format!("{IPSET_PREFIX}{n}"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Address(a) => f.write_str(a),
            Source::Mac(m) => write!(f, "mac:{m}"),
            Source::IpSet(n) => write!(f, "{IPSET_PREFIX}{n}"),
        }
    }
}

fn is_mac(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

fn validate_network(s: &str) -> Result<()> {
    let (addr, prefix) = match s.split_once('/') {
        Some((a, p)) => (a, Some(p)),
        None => (s, None),
    };
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| Error::invalid(format!("'{s}' is not an IP address, network or MAC")))?;
    if let Some(prefix) = prefix {
        let max = if addr.is_ipv4() { 32 } else { 128 };
        match prefix.parse::<u8>() {
            Ok(p) if p <= max => {}
            _ => return Err(Error::invalid(format!("'{prefix}' is not a valid prefix length"))),
        }
    }
    Ok(())
}
