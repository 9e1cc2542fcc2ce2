// Zonekeeper - Service Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewall service definition model.

use super::Port;

/// A service definition as read from a firewalld service file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceInfo {
    pub name: String,
    pub short: String,
    pub description: String,
    pub ports: Vec<Port>,
    pub protocols: Vec<String>,
    pub source_ports: Vec<Port>,
    /// Netfilter helpers (`<module>` and `<helper>` elements).
    pub modules: Vec<String>,
    /// `(family, address)` pairs from the `<destination>` element.
    pub destinations: Vec<(String, String)>,
    pub includes: Vec<String>,
}

impl ServiceInfo {
    /// Create a new service.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Get the risk level of the service.
    pub fn risk_level(&self) -> &'static str {
        match self.name.as_str() {
            "ssh" | "cockpit" | "vnc-server" => "medium",
            "ftp" | "telnet" | "rsh" | "rlogin" => "high",
            _ => "low",
        }
    }

    /// Get a human-readable description.
    pub fn human_description(&self) -> &str {
        if !self.description.is_empty() {
            &self.description
        } else if !self.short.is_empty() {
            &self.short
        } else {
            match self.name.as_str() {
                "ssh" => "Secure Shell remote access",
                "http" => "Web server (unencrypted)",
                "https" => "Web server (encrypted)",
                "dns" => "Domain Name System",
                "dhcp" => "Dynamic Host Configuration Protocol",
                "samba" => "Windows file sharing",
                "nfs" => "Network File System",
                "cockpit" => "Web-based server management",
                _ => "Network service",
            }
        }
    }

    /// Get a summary of the ports used by this service.
    pub fn ports_summary(&self) -> String {
        if self.ports.is_empty() {
            return String::new();
        }

        let port_strs: Vec<String> = self.ports.iter().take(3).map(Port::key).collect();

        if self.ports.len() > 3 {
            format!("{} +{}", port_strs.join(", "), self.ports.len() - 3)
        } else {
            port_strs.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Protocol;

    #[test]
    fn test_ports_summary_truncates() {
        let mut svc = ServiceInfo::new("custom");
        assert_eq!(svc.ports_summary(), "");
        svc.ports = (1..=5)
            .map(|n| Port::new(n.to_string(), Protocol::Tcp))
            .collect();
        assert_eq!(svc.ports_summary(), "1/tcp, 2/tcp, 3/tcp +2");
    }

    #[test]
    fn test_description_fallbacks() {
        let mut svc = ServiceInfo::new("ssh");
        assert_eq!(svc.human_description(), "Secure Shell remote access");
        svc.short = "SSH".into();
        assert_eq!(svc.human_description(), "SSH");
        svc.description = "Remote login".into();
        assert_eq!(svc.human_description(), "Remote login");
    }
}
