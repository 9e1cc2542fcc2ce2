// Zonekeeper - Settings Decoder
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Normalization of firewalld replies into the canonical models.
//!
//! firewalld answers the same question with different shapes depending on
//! the method and the daemon version: ports arrive as `a(ss)`, as `aas`, or
//! as `"port/proto"` strings; zone settings arrive as an `a{sv}` map or as a
//! positional legacy tuple. Every reply is first lifted into [`Wire`], then
//! matched exhaustively here. Nothing in this module performs I/O.

use std::collections::HashSet;

use tracing::warn;
use zbus::zvariant::Value;

use crate::error::{Error, Result};
use crate::models::{ForwardPort, Port, Source, Zone};

/// The legal shapes of a D-Bus value, stripped of signature details.
#[derive(Debug, Clone, PartialEq)]
pub enum Wire {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Wire>),
    Tuple(Vec<Wire>),
    Map(Vec<(String, Wire)>),
    Variant(Box<Wire>),
}

impl Wire {
    /// Short name of the shape, used in decode errors and logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Wire::Bool(_) => "bool",
            Wire::Int(_) => "integer",
            Wire::Str(_) => "string",
            Wire::List(_) => "list",
            Wire::Tuple(_) => "tuple",
            Wire::Map(_) => "map",
            Wire::Variant(_) => "variant",
        }
    }

    /// Peel off any number of variant wrappers.
    pub fn unwrapped(&self) -> &Wire {
        let mut wire = self;
        while let Wire::Variant(inner) = wire {
            wire = inner;
        }
        wire
    }

    fn get(&self, key: &str) -> Option<&Wire> {
        match self.unwrapped() {
            Wire::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self.unwrapped() {
            Wire::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convenience constructor for fixtures: a list of strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Wire::List(items.into_iter().map(|s| Wire::Str(s.into())).collect())
    }
}

impl From<&str> for Wire {
    fn from(s: &str) -> Self {
        Wire::Str(s.to_string())
    }
}

impl From<bool> for Wire {
    fn from(b: bool) -> Self {
        Wire::Bool(b)
    }
}

impl TryFrom<&Value<'_>> for Wire {
    type Error = Error;

    fn try_from(value: &Value<'_>) -> Result<Self> {
        let wire = match value {
            Value::Bool(b) => Wire::Bool(*b),
            Value::U8(n) => Wire::Int(i64::from(*n)),
            Value::I16(n) => Wire::Int(i64::from(*n)),
            Value::U16(n) => Wire::Int(i64::from(*n)),
            Value::I32(n) => Wire::Int(i64::from(*n)),
            Value::U32(n) => Wire::Int(i64::from(*n)),
            Value::I64(n) => Wire::Int(*n),
            Value::Str(s) => Wire::Str(s.as_str().to_string()),
            Value::ObjectPath(p) => Wire::Str(p.as_str().to_string()),
            Value::Signature(s) => Wire::Str(s.as_str().to_string()),
            Value::Value(inner) => Wire::Variant(Box::new(Wire::try_from(&**inner)?)),
            Value::Array(array) => Wire::List(
                array
                    .iter()
                    .map(Wire::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Structure(structure) => Wire::Tuple(
                structure
                    .fields()
                    .iter()
                    .map(Wire::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Dict(dict) => {
                let mut entries = Vec::new();
                for (key, value) in dict.iter() {
                    let key = match Wire::try_from(key)? {
                        Wire::Str(k) => k,
                        Wire::Int(n) => n.to_string(),
                        other => {
                            return Err(Error::Decode {
                                field: "dictionary key".to_string(),
                                found: other.shape().to_string(),
                            })
                        }
                    };
                    entries.push((key, Wire::try_from(value)?));
                }
                Wire::Map(entries)
            }
            other => {
                return Err(Error::Decode {
                    field: "value".to_string(),
                    found: other.value_signature().to_string(),
                })
            }
        };
        Ok(wire)
    }
}

fn unexpected(field: &str, wire: &Wire) -> Error {
    Error::Decode {
        field: field.to_string(),
        found: wire.shape().to_string(),
    }
}

/// Remove exact duplicates, keeping the first occurrence of each item.
pub fn dedup_preserving_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn elements<'w>(field: &str, wire: &'w Wire) -> Result<&'w [Wire]> {
    match wire.unwrapped() {
        Wire::List(items) | Wire::Tuple(items) => Ok(items),
        other => Err(unexpected(field, other)),
    }
}

/// Decode a list of strings, skipping elements of any other shape.
pub fn decode_string_list(field: &str, wire: &Wire) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for item in elements(field, wire)? {
        match item.unwrapped() {
            Wire::Str(s) => out.push(s.clone()),
            other => warn!("Skipping {} element in {}: expected string", other.shape(), field),
        }
    }
    Ok(dedup_preserving_order(out))
}

/// Decode a port list from any of the shapes firewalld uses.
///
/// Elements may be `(port, proto)` tuples, two-element string lists, or
/// `"port/proto"` strings. Malformed elements are logged and skipped.
pub fn decode_ports(field: &str, wire: &Wire) -> Result<Vec<Port>> {
    let mut out = Vec::new();
    for item in elements(field, wire)? {
        match port_element(item) {
            Some(Ok(port)) => out.push(port),
            Some(Err(e)) => warn!("Skipping port in {}: {}", field, e),
            None => warn!("Skipping {} element in {}: expected port", item.unwrapped().shape(), field),
        }
    }
    Ok(dedup_preserving_order(out))
}

fn port_element(item: &Wire) -> Option<Result<Port>> {
    match item.unwrapped() {
        Wire::Tuple(parts) | Wire::List(parts) if parts.len() >= 2 => {
            let port = parts[0].as_str()?;
            let proto = parts[1].as_str()?;
            Some(Port::from_wire(port, proto))
        }
        Wire::Str(s) => {
            let (port, proto) = s.split_once('/')?;
            Some(Port::from_wire(port, proto))
        }
        _ => None,
    }
}

/// Decode zone sources, classifying each string.
pub fn decode_sources(field: &str, wire: &Wire) -> Result<Vec<Source>> {
    Ok(decode_string_list(field, wire)?
        .iter()
        .map(|s| Source::from_wire(s))
        .collect())
}

fn decode_forward_ports(field: &str, wire: &Wire) -> Result<Vec<ForwardPort>> {
    let mut out = Vec::new();
    for item in elements(field, wire)? {
        let parts = match item.unwrapped() {
            Wire::Tuple(parts) | Wire::List(parts) if parts.len() == 4 => parts,
            other => {
                warn!("Skipping {} element in {}: expected 4-tuple", other.shape(), field);
                continue;
            }
        };
        let text: Vec<&str> = parts.iter().filter_map(Wire::as_str).collect();
        if let [port, protocol, to_port, to_addr] = text[..] {
            out.push(ForwardPort {
                port: port.to_string(),
                protocol: protocol.to_string(),
                to_port: to_port.to_string(),
                to_addr: to_addr.to_string(),
            });
        } else {
            warn!("Skipping forward port with non-string fields in {}", field);
        }
    }
    Ok(out)
}

pub fn decode_bool(field: &str, wire: &Wire) -> Result<bool> {
    match wire.unwrapped() {
        Wire::Bool(b) => Ok(*b),
        other => Err(unexpected(field, other)),
    }
}

pub fn decode_string(field: &str, wire: &Wire) -> Result<String> {
    match wire.unwrapped() {
        Wire::Str(s) => Ok(s.clone()),
        other => Err(unexpected(field, other)),
    }
}

/// Decode an optional field; absent fields and fields of the wrong shape
/// both yield the default, the latter with a warning.
fn optional<T: Default>(
    zone: &str,
    field: &str,
    wire: Option<&Wire>,
    decode: impl FnOnce(&str, &Wire) -> Result<T>,
) -> T {
    match wire {
        None => T::default(),
        Some(w) => decode(field, w).unwrap_or_else(|e| {
            warn!("Dropping field {} of zone {}: {}", field, zone, e);
            T::default()
        }),
    }
}

/// Decode a zone settings reply in either the map or the legacy tuple shape.
pub fn decode_zone_settings(name: &str, wire: &Wire) -> Result<Zone> {
    match wire.unwrapped() {
        Wire::Map(_) => Ok(decode_settings_map(name, wire.unwrapped())),
        Wire::Tuple(fields) => Ok(decode_settings_tuple(name, fields)),
        other => Err(unexpected("zone settings", other)),
    }
}

fn decode_settings_map(name: &str, map: &Wire) -> Zone {
    let field = |key: &str| map.get(key);
    Zone {
        name: name.to_string(),
        short: optional(name, "short", field("short"), decode_string),
        description: optional(name, "description", field("description"), decode_string),
        target: optional(name, "target", field("target"), decode_string),
        services: optional(name, "services", field("services"), decode_string_list),
        ports: optional(name, "ports", field("ports"), decode_ports),
        rich_rules: optional(name, "rules_str", field("rules_str"), decode_string_list),
        interfaces: optional(name, "interfaces", field("interfaces"), decode_string_list),
        sources: optional(name, "sources", field("sources"), decode_sources),
        masquerade: optional(name, "masquerade", field("masquerade"), decode_bool),
        icmp_blocks: optional(name, "icmp_blocks", field("icmp_blocks"), decode_string_list),
        icmp_block_inversion: optional(
            name,
            "icmp_block_inversion",
            field("icmp_block_inversion"),
            decode_bool,
        ),
        forward: optional(name, "forward", field("forward"), decode_bool),
        protocols: optional(name, "protocols", field("protocols"), decode_string_list),
        source_ports: optional(name, "source_ports", field("source_ports"), decode_ports),
        forward_ports: optional(name, "forward_ports", field("forward_ports"), decode_forward_ports),
    }
}

// Positions in the legacy `(sssbsasa(ss)asba(ssss)asasasasa(ss)b)` tuple.
const LEGACY_SHORT: usize = 1;
const LEGACY_DESCRIPTION: usize = 2;
const LEGACY_TARGET: usize = 4;
const LEGACY_SERVICES: usize = 5;
const LEGACY_PORTS: usize = 6;
const LEGACY_ICMP_BLOCKS: usize = 7;
const LEGACY_MASQUERADE: usize = 8;
const LEGACY_FORWARD_PORTS: usize = 9;
const LEGACY_INTERFACES: usize = 10;
const LEGACY_SOURCES: usize = 11;
const LEGACY_RULES: usize = 12;
const LEGACY_PROTOCOLS: usize = 13;
const LEGACY_SOURCE_PORTS: usize = 14;
const LEGACY_ICMP_INVERSION: usize = 15;

fn decode_settings_tuple(name: &str, fields: &[Wire]) -> Zone {
    let at = |i: usize| fields.get(i);
    Zone {
        name: name.to_string(),
        short: optional(name, "short", at(LEGACY_SHORT), decode_string),
        description: optional(name, "description", at(LEGACY_DESCRIPTION), decode_string),
        target: optional(name, "target", at(LEGACY_TARGET), decode_string),
        services: optional(name, "services", at(LEGACY_SERVICES), decode_string_list),
        ports: optional(name, "ports", at(LEGACY_PORTS), decode_ports),
        rich_rules: optional(name, "rules_str", at(LEGACY_RULES), decode_string_list),
        interfaces: optional(name, "interfaces", at(LEGACY_INTERFACES), decode_string_list),
        sources: optional(name, "sources", at(LEGACY_SOURCES), decode_sources),
        masquerade: optional(name, "masquerade", at(LEGACY_MASQUERADE), decode_bool),
        icmp_blocks: optional(name, "icmp_blocks", at(LEGACY_ICMP_BLOCKS), decode_string_list),
        icmp_block_inversion: optional(
            name,
            "icmp_block_inversion",
            at(LEGACY_ICMP_INVERSION),
            decode_bool,
        ),
        forward: false,
        protocols: optional(name, "protocols", at(LEGACY_PROTOCOLS), decode_string_list),
        source_ports: optional(name, "source_ports", at(LEGACY_SOURCE_PORTS), decode_ports),
        forward_ports: optional(name, "forward_ports", at(LEGACY_FORWARD_PORTS), decode_forward_ports),
    }
}

/// Decode `getActiveZones`: `zone -> {"interfaces": [...], "sources": [...]}`.
///
/// Returns each zone with the union of its interfaces and sources, in the
/// order the daemon listed them.
pub fn decode_active_zones(wire: &Wire) -> Result<Vec<(String, Vec<String>)>> {
    let zones = match wire.unwrapped() {
        Wire::Map(zones) => zones,
        other => return Err(unexpected("active zones", other)),
    };

    let mut out = Vec::with_capacity(zones.len());
    for (zone, categories) in zones {
        let categories = match categories.unwrapped() {
            Wire::Map(c) => c,
            other => {
                warn!("Skipping active zone {}: expected map, got {}", zone, other.shape());
                continue;
            }
        };
        let mut refs = Vec::new();
        for (category, items) in categories {
            if category != "interfaces" && category != "sources" {
                continue;
            }
            match decode_string_list(category, items) {
                Ok(list) => refs.extend(list),
                Err(e) => warn!("Skipping {} of active zone {}: {}", category, zone, e),
            }
        }
        out.push((zone.clone(), dedup_preserving_order(refs)));
    }
    Ok(out)
}
