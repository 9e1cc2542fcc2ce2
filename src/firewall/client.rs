// Zonekeeper - D-Bus Client
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewalld D-Bus client implementation.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use zbus::blocking::Connection;
use zbus::zvariant::{DynamicType, OwnedObjectPath, Structure, Value};
use zbus::Message;

use super::decode::{self, Wire};
use super::{interfaces, paths, Backend, CallThrottle, BUS_NAME};
use crate::error::{Error, Result};
use crate::models::{IpSetInfo, Port, Source, View, Zone};

/// Client for interacting with firewalld via D-Bus.
pub struct FirewallClient {
    connection: Connection,
    throttle: CallThrottle,
    version: Option<String>,
}

impl FirewallClient {
    /// Connect to firewalld and verify it answers.
    pub fn connect(min_call_interval: Duration) -> Result<Self> {
        info!("Connecting to firewalld...");

        let connection = Connection::system()
            .map_err(|e| Error::NotRunning(format!("system bus unavailable: {e}")))?;

        // Test connection by getting the default zone
        let _: String = connection
            .call_method(
                Some(BUS_NAME),
                paths::ROOT,
                Some(interfaces::MAIN),
                "getDefaultZone",
                &(),
            )
            .map_err(|e| match Error::from(e) {
                Error::PermissionDenied(m) => Error::PermissionDenied(m),
                other => Error::NotRunning(other.to_string()),
            })?
            .body()
            .deserialize()?;

        let mut client = Self {
            connection,
            throttle: CallThrottle::new(min_call_interval),
            version: None,
        };
        client.version = client.daemon_version().ok();

        info!(
            "Connected to firewalld {}",
            client.version.as_deref().unwrap_or("(unknown version)")
        );
        Ok(client)
    }

    fn daemon_version(&self) -> Result<String> {
        let reply = self.call(
            paths::ROOT,
            interfaces::PROPERTIES,
            "Get",
            &(interfaces::MAIN, "version"),
        )?;
        decode::decode_string("version", &reply_wire(&reply)?)
    }

    fn call<B>(&self, path: &str, interface: &str, method: &str, body: &B) -> Result<Message>
    where
        B: Serialize + DynamicType,
    {
        debug!("D-Bus call {}.{} on {}", interface, method, path);
        self.connection
            .call_method(Some(BUS_NAME), path, Some(interface), method, body)
            .map_err(|e| Error::from(e).for_operation(method))
    }

    /// Like [`call`](Self::call), but spaced by the throttle.
    fn call_mutating<B>(&self, path: &str, interface: &str, method: &str, body: &B) -> Result<()>
    where
        B: Serialize + DynamicType,
    {
        self.throttle.wait();
        self.call(path, interface, method, body).map(drop)
    }

    fn strings(&self, path: &str, interface: &str, method: &str, body: &(impl Serialize + DynamicType)) -> Result<Vec<String>> {
        let reply = self.call(path, interface, method, body)?;
        decode::decode_string_list(method, &reply_wire(&reply)?)
    }

    /// Get the D-Bus path for a zone's permanent config.
    fn config_zone(&self, zone: &str) -> Result<OwnedObjectPath> {
        let path: OwnedObjectPath = self
            .call(paths::CONFIG, interfaces::CONFIG, "getZoneByName", &(zone,))
            .map_err(|e| e.for_zone(zone))?
            .body()
            .deserialize()?;
        Ok(path)
    }

    fn config_ipset(&self, name: &str) -> Result<OwnedObjectPath> {
        let path: OwnedObjectPath = self
            .call(paths::CONFIG, interfaces::CONFIG, "getIPSetByName", &(name,))?
            .body()
            .deserialize()?;
        Ok(path)
    }

    /// Run `method` on the runtime zone interface or the zone's config object.
    ///
    /// Runtime calls name the zone as their first argument; config object
    /// calls do not.
    fn zone_mutation<R, P>(
        &self,
        zone: &str,
        view: View,
        method: &str,
        runtime_body: &R,
        permanent_body: &P,
        what: &str,
    ) -> Result<()>
    where
        R: Serialize + DynamicType,
        P: Serialize + DynamicType,
    {
        let result = match view {
            View::Runtime => self.call_mutating(paths::ROOT, interfaces::ZONE, method, runtime_body),
            View::Permanent => self.config_zone(zone).and_then(|path| {
                self.call_mutating(path.as_str(), interfaces::CONFIG_ZONE, method, permanent_body)
            }),
        };
        result.map_err(|e| e.for_zone(zone))?;

        info!("{} {} in zone {} ({})", method, what, zone, view);
        Ok(())
    }

    fn settings_call(&self, zone: &str, view: View, method: &str) -> Result<Message> {
        match view {
            View::Runtime => {
                let interface = if method == "getZoneSettings" {
                    interfaces::MAIN
                } else {
                    interfaces::ZONE
                };
                self.call(paths::ROOT, interface, method, &(zone,))
            }
            View::Permanent => {
                let path = self.config_zone(zone)?;
                let method = if method == "getZoneSettings" { "getSettings" } else { "getSettings2" };
                self.call(path.as_str(), interfaces::CONFIG_ZONE, method, &())
            }
        }
    }
}

/// Lift a reply body into a [`Wire`] value (its first argument).
fn reply_wire(reply: &Message) -> Result<Wire> {
    let body = reply.body();
    let fields: Structure = body.deserialize()?;
    match fields.fields().first() {
        Some(value) => Wire::try_from(value),
        None => Err(Error::Decode {
            field: "reply".to_string(),
            found: "empty body".to_string(),
        }),
    }
}

impl Backend for FirewallClient {
    fn version(&self) -> Option<String> {
        self.version.clone()
    }

    fn list_zones(&self, view: View) -> Result<Vec<String>> {
        match view {
            View::Runtime => self.strings(paths::ROOT, interfaces::ZONE, "getZones", &()),
            View::Permanent => self.strings(paths::CONFIG, interfaces::CONFIG, "getZoneNames", &()),
        }
    }

    fn default_zone(&self) -> Result<String> {
        let zone: String = self
            .call(paths::ROOT, interfaces::MAIN, "getDefaultZone", &())?
            .body()
            .deserialize()?;
        Ok(zone)
    }

    fn set_default_zone(&self, zone: &str) -> Result<()> {
        self.call_mutating(paths::ROOT, interfaces::MAIN, "setDefaultZone", &(zone,))
            .map_err(|e| e.for_zone(zone))?;
        info!("Set default zone to: {}", zone);
        Ok(())
    }

    fn active_zones(&self) -> Result<Vec<(String, Vec<String>)>> {
        let reply = self.call(paths::ROOT, interfaces::ZONE, "getActiveZones", &())?;
        decode::decode_active_zones(&reply_wire(&reply)?)
    }

    fn zone_settings(&self, zone: &str, view: View) -> Result<Zone> {
        let reply = match self.settings_call(zone, view, "getZoneSettings2") {
            Err(e) if e.is_unsupported() => {
                debug!("Falling back to legacy zone settings for {}", zone);
                self.settings_call(zone, view, "getZoneSettings")
            }
            other => other,
        }
        .map_err(|e| e.for_zone(zone))?;

        decode::decode_zone_settings(zone, &reply_wire(&reply)?)
    }

    fn add_zone(&self, name: &str) -> Result<()> {
        let settings: HashMap<&str, Value<'_>> = HashMap::new();
        self.call_mutating(paths::CONFIG, interfaces::CONFIG, "addZone2", &(name, settings))?;
        info!("Created zone {}", name);
        Ok(())
    }

    fn remove_zone(&self, name: &str) -> Result<()> {
        let path = self.config_zone(name)?;
        self.call_mutating(path.as_str(), interfaces::CONFIG_ZONE, "remove", &())
            .map_err(|e| e.for_zone(name))?;
        info!("Removed zone {}", name);
        Ok(())
    }

    fn add_service(&self, zone: &str, view: View, service: &str) -> Result<()> {
        self.zone_mutation(zone, view, "addService", &(zone, service, 0i32), &(service,), service)
    }

    fn remove_service(&self, zone: &str, view: View, service: &str) -> Result<()> {
        self.zone_mutation(zone, view, "removeService", &(zone, service), &(service,), service)
    }

    fn add_port(&self, zone: &str, view: View, port: &Port) -> Result<()> {
        let (p, proto) = (port.port.as_str(), port.protocol.as_str());
        self.zone_mutation(zone, view, "addPort", &(zone, p, proto, 0i32), &(p, proto), &port.key())
    }

    fn remove_port(&self, zone: &str, view: View, port: &Port) -> Result<()> {
        let (p, proto) = (port.port.as_str(), port.protocol.as_str());
        self.zone_mutation(zone, view, "removePort", &(zone, p, proto), &(p, proto), &port.key())
    }

    fn add_rich_rule(&self, zone: &str, view: View, rule: &str) -> Result<()> {
        self.zone_mutation(zone, view, "addRichRule", &(zone, rule, 0i32), &(rule,), rule)
    }

    fn remove_rich_rule(&self, zone: &str, view: View, rule: &str) -> Result<()> {
        self.zone_mutation(zone, view, "removeRichRule", &(zone, rule), &(rule,), rule)
    }

    fn add_interface(&self, zone: &str, view: View, interface: &str) -> Result<()> {
        self.zone_mutation(zone, view, "addInterface", &(zone, interface), &(interface,), interface)
    }

    fn remove_interface(&self, zone: &str, view: View, interface: &str) -> Result<()> {
        self.zone_mutation(zone, view, "removeInterface", &(zone, interface), &(interface,), interface)
    }

    fn add_source(&self, zone: &str, view: View, source: &Source) -> Result<()> {
        let wire = source.to_wire();
        self.zone_mutation(zone, view, "addSource", &(zone, wire.as_str()), &(wire.as_str(),), &wire)
    }

    fn remove_source(&self, zone: &str, view: View, source: &Source) -> Result<()> {
        let wire = source.to_wire();
        self.zone_mutation(zone, view, "removeSource", &(zone, wire.as_str()), &(wire.as_str(),), &wire)
    }

    fn set_masquerade(&self, zone: &str, view: View, enabled: bool) -> Result<()> {
        let result = match (view, enabled) {
            (View::Runtime, true) => {
                self.call_mutating(paths::ROOT, interfaces::ZONE, "addMasquerade", &(zone, 0i32))
            }
            (View::Runtime, false) => {
                self.call_mutating(paths::ROOT, interfaces::ZONE, "removeMasquerade", &(zone,))
            }
            (View::Permanent, _) => self.config_zone(zone).and_then(|path| {
                self.call_mutating(path.as_str(), interfaces::CONFIG_ZONE, "setMasquerade", &(enabled,))
            }),
        };
        result.map_err(|e| e.for_zone(zone))?;

        info!("Masquerade {} in zone {} ({})", if enabled { "on" } else { "off" }, zone, view);
        Ok(())
    }

    fn query_panic_mode(&self) -> Result<bool> {
        let enabled: bool = self
            .call(paths::ROOT, interfaces::MAIN, "queryPanicMode", &())?
            .body()
            .deserialize()?;
        Ok(enabled)
    }

    fn set_panic_mode(&self, enabled: bool) -> Result<()> {
        let method = if enabled { "enablePanicMode" } else { "disablePanicMode" };
        self.call_mutating(paths::ROOT, interfaces::MAIN, method, &())?;
        if enabled {
            info!("Panic mode enabled - all traffic blocked");
        } else {
            info!("Panic mode disabled - normal operation restored");
        }
        Ok(())
    }

    fn list_ipsets(&self) -> Result<Vec<String>> {
        self.strings(paths::ROOT, interfaces::IPSET, "getIPSets", &())
    }

    fn ipset_entries(&self, name: &str) -> Result<IpSetInfo> {
        let entries = self.strings(paths::ROOT, interfaces::IPSET, "getEntries", &(name,))?;
        Ok(IpSetInfo {
            name: name.to_string(),
            entries,
        })
    }

    fn add_ipset_entry(&self, name: &str, entry: &str) -> Result<()> {
        self.call_mutating(paths::ROOT, interfaces::IPSET, "addEntry", &(name, entry))?;
        info!("Added {} to ipset {}", entry, name);
        Ok(())
    }

    fn remove_ipset_entry(&self, name: &str, entry: &str) -> Result<()> {
        self.call_mutating(paths::ROOT, interfaces::IPSET, "removeEntry", &(name, entry))?;
        info!("Removed {} from ipset {}", entry, name);
        Ok(())
    }

    fn add_ipset(&self, name: &str, kind: &str) -> Result<()> {
        // (version, short, description, type, options, entries)
        let settings = ("", "", "", kind, HashMap::<&str, &str>::new(), Vec::<&str>::new());
        self.call_mutating(paths::CONFIG, interfaces::CONFIG, "addIPSet", &(name, settings))?;
        info!("Created ipset {} ({})", name, kind);
        Ok(())
    }

    fn remove_ipset(&self, name: &str) -> Result<()> {
        let path = self.config_ipset(name)?;
        self.call_mutating(path.as_str(), interfaces::CONFIG_IPSET, "remove", &())?;
        info!("Removed ipset {}", name);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.call_mutating(paths::ROOT, interfaces::MAIN, "runtimeToPermanent", &())?;
        info!("Runtime configuration made permanent");
        Ok(())
    }

    fn reload(&self) -> Result<()> {
        self.call_mutating(paths::ROOT, interfaces::MAIN, "reload", &())?;
        info!("Firewalld configuration reloaded");
        Ok(())
    }
}
