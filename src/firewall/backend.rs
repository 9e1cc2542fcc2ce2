// Zonekeeper - Backend Seam
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! The synchronous operation catalogue the orchestrator drives.

use crate::error::Result;
use crate::models::{IpSetInfo, Port, Source, View, Zone};

/// Request/response operations against a firewall daemon.
///
/// Every call blocks; the executor runs them off the dispatch loop.
/// Zone-qualified mutations report `PermissionDenied`, `InvalidZone`,
/// `UnsupportedApi` or `Transport` on failure.
pub trait Backend: Send + Sync {
    /// Daemon version string, when known.
    fn version(&self) -> Option<String> {
        None
    }

    fn list_zones(&self, view: View) -> Result<Vec<String>>;
    fn default_zone(&self) -> Result<String>;
    fn set_default_zone(&self, zone: &str) -> Result<()>;
    /// Active zones with the interfaces and sources bound to each.
    fn active_zones(&self) -> Result<Vec<(String, Vec<String>)>>;
    fn zone_settings(&self, zone: &str, view: View) -> Result<Zone>;

    /// Create an empty zone in the permanent configuration.
    fn add_zone(&self, name: &str) -> Result<()>;
    /// Delete a zone from the permanent configuration.
    fn remove_zone(&self, name: &str) -> Result<()>;

    fn add_service(&self, zone: &str, view: View, service: &str) -> Result<()>;
    fn remove_service(&self, zone: &str, view: View, service: &str) -> Result<()>;
    fn add_port(&self, zone: &str, view: View, port: &Port) -> Result<()>;
    fn remove_port(&self, zone: &str, view: View, port: &Port) -> Result<()>;
    fn add_rich_rule(&self, zone: &str, view: View, rule: &str) -> Result<()>;
    fn remove_rich_rule(&self, zone: &str, view: View, rule: &str) -> Result<()>;
    fn add_interface(&self, zone: &str, view: View, interface: &str) -> Result<()>;
    fn remove_interface(&self, zone: &str, view: View, interface: &str) -> Result<()>;
    fn add_source(&self, zone: &str, view: View, source: &Source) -> Result<()>;
    fn remove_source(&self, zone: &str, view: View, source: &Source) -> Result<()>;
    fn set_masquerade(&self, zone: &str, view: View, enabled: bool) -> Result<()>;

    fn query_panic_mode(&self) -> Result<bool>;
    fn set_panic_mode(&self, enabled: bool) -> Result<()>;

    fn list_ipsets(&self) -> Result<Vec<String>>;
    fn ipset_entries(&self, name: &str) -> Result<IpSetInfo>;
    fn add_ipset_entry(&self, name: &str, entry: &str) -> Result<()>;
    fn remove_ipset_entry(&self, name: &str, entry: &str) -> Result<()>;
    /// Create a named set of the given type (e.g. `hash:ip`) permanently.
    fn add_ipset(&self, name: &str, kind: &str) -> Result<()>;
    fn remove_ipset(&self, name: &str) -> Result<()>;

    /// Copy the runtime configuration over the permanent one.
    fn commit(&self) -> Result<()>;
    fn reload(&self) -> Result<()>;
}
