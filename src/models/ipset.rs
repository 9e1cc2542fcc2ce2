// Zonekeeper - Named Set Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Named address sets (ipsets).

/// A named set and its runtime entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpSetInfo {
    pub name: String,
    pub entries: Vec<String>,
}

impl IpSetInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }
}
