// Zonekeeper - Zone Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewall zone model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ForwardPort, Port, Source};
use crate::error::{Error, Result};

/// Longest zone name accepted anywhere a name becomes a file path.
pub const MAX_ZONE_NAME_LEN: usize = 128;

/// Which of firewalld's two configurations an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Live configuration, lost on reload.
    #[default]
    Runtime,
    /// Configuration on disk, applied on reload.
    Permanent,
}

impl View {
    pub fn toggled(self) -> Self {
        match self {
            View::Runtime => View::Permanent,
            View::Permanent => View::Runtime,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            View::Runtime => "runtime",
            View::Permanent => "permanent",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A firewall zone in one view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Zone {
    pub name: String,
    pub short: String,
    pub description: String,
    pub target: String,
    pub services: Vec<String>,
    pub ports: Vec<Port>,
    pub rich_rules: Vec<String>,
    pub interfaces: Vec<String>,
    pub sources: Vec<Source>,
    pub masquerade: bool,
    pub icmp_blocks: Vec<String>,
    pub icmp_block_inversion: bool,
    pub forward: bool,
    pub protocols: Vec<String>,
    pub source_ports: Vec<Port>,
    pub forward_ports: Vec<ForwardPort>,
}

impl Zone {
    /// Create a new zone.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn has_service(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }

    pub fn has_port(&self, port: &Port) -> bool {
        self.ports.contains(port)
    }

    /// Get a human-readable description of the zone's purpose.
    pub fn purpose(&self) -> &str {
        if !self.short.is_empty() {
            return &self.short;
        }
        match self.name.as_str() {
            "drop" => "Drops all incoming connections silently",
            "block" => "Rejects incoming connections with ICMP messages",
            "public" => "For use in public areas, only selected services allowed",
            "external" => "For external networks with masquerading",
            "dmz" => "Demilitarized zone for publicly accessible services",
            "work" => "For work environment, trusts most computers",
            "home" => "For home use, trusts other computers",
            "internal" => "For internal networks, high trust level",
            "trusted" => "All connections are accepted",
            _ => "Custom zone",
        }
    }
}

/// Check that a zone name is safe to embed in a file path.
///
/// Rejects empty names, names longer than [`MAX_ZONE_NAME_LEN`], any path
/// separator and any `..` sequence.
pub fn validate_zone_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("Zone name must not be empty"));
    }
    if name.len() > MAX_ZONE_NAME_LEN {
        return Err(Error::invalid(format!(
            "Zone name is longer than {MAX_ZONE_NAME_LEN} characters"
        )));
    }
    if name.contains(['/', '\\', '\0']) || name.contains("..") {
        return Err(Error::invalid(format!("Zone name '{name}' is not allowed")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_name_validation() {
        assert!(validate_zone_name("my-zone_1").is_ok());
        assert!(validate_zone_name("public").is_ok());

        assert!(validate_zone_name("").is_err());
        assert!(validate_zone_name("../x").is_err());
        assert!(validate_zone_name("a/b").is_err());
        assert!(validate_zone_name("a\\b").is_err());
        assert!(validate_zone_name("x..y").is_err());
        assert!(validate_zone_name(&"z".repeat(MAX_ZONE_NAME_LEN)).is_ok());
        assert!(validate_zone_name(&"z".repeat(MAX_ZONE_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_view_toggle() {
        assert_eq!(View::Runtime.toggled(), View::Permanent);
        assert_eq!(View::Permanent.toggled(), View::Runtime);
        assert_eq!(View::default(), View::Runtime);
    }

    #[test]
    fn test_purpose_prefers_short_text() {
        let mut zone = Zone::new("public");
        assert!(zone.purpose().starts_with("For use in public areas"));
        zone.short = "Public".into();
        assert_eq!(zone.purpose(), "Public");
    }
}
