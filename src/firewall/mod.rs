// Zonekeeper - Firewall Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewalld D-Bus gateway and related utilities.

mod backend;
mod client;
pub mod decode;
mod services;
mod signals;
mod throttle;

pub use backend::Backend;
#[cfg(test)]
pub use backend::fake;
pub use client::FirewallClient;
pub use services::{parse_service_definition, ServiceCatalog};
#[cfg(test)]
pub use signals::scripted;
pub use signals::{signal_from_parts, EventSource, FirewallSignal, Subscription};
pub use throttle::CallThrottle;

/// D-Bus bus name for firewalld.
pub const BUS_NAME: &str = "org.fedoraproject.FirewallD1";

/// D-Bus object paths.
pub mod paths {
    pub const ROOT: &str = "/org/fedoraproject/FirewallD1";
    pub const CONFIG: &str = "/org/fedoraproject/FirewallD1/config";
}

/// D-Bus interface names.
pub mod interfaces {
    /// Main firewalld interface (for getDefaultZone, setDefaultZone, reload, etc.)
    pub const MAIN: &str = "org.fedoraproject.FirewallD1";
    /// Zone interface (for zone-specific operations)
    pub const ZONE: &str = "org.fedoraproject.FirewallD1.zone";
    pub const IPSET: &str = "org.fedoraproject.FirewallD1.ipset";
    pub const CONFIG: &str = "org.fedoraproject.FirewallD1.config";
    pub const CONFIG_ZONE: &str = "org.fedoraproject.FirewallD1.config.zone";
    pub const CONFIG_IPSET: &str = "org.fedoraproject.FirewallD1.config.ipset";
    pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
}

/// Get a description for a zone name.
pub fn zone_description(name: &str) -> &'static str {
    match name {
        "drop" => "Drops all incoming network packets with no reply. Only outgoing connections are possible.",
        "block" => "Incoming connections are rejected with an icmp-host-prohibited message. Only outgoing connections are possible.",
        "public" => "For use in public areas. You do not trust other computers. Only selected connections are accepted.",
        "external" => "For use on external networks with masquerading enabled. Only selected connections are accepted.",
        "dmz" => "For computers in your demilitarized zone that are publicly accessible. Only selected connections are accepted.",
        "work" => "For use in work areas. You mostly trust other computers. Only selected connections are accepted.",
        "home" => "For use at home. You mostly trust other computers. Only selected connections are accepted.",
        "internal" => "For use on internal networks. You mostly trust other computers. Only selected connections are accepted.",
        "trusted" => "All network connections are accepted.",
        _ => "Custom zone",
    }
}
