// Zonekeeper - Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Canonical data models for firewall entities.

mod ipset;
mod port;
mod service;
mod source;
mod zone;

pub use ipset::IpSetInfo;
pub use port::{ForwardPort, Port, Protocol};
pub use service::ServiceInfo;
pub use source::Source;
pub use zone::{validate_zone_name, View, Zone, MAX_ZONE_NAME_LEN};
