// Zonekeeper - Commands
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Work the dispatch loop hands to the executor.

use std::fmt;
use std::time::Duration;

use super::{Disposition, Op, Step};
use crate::backup::Backup;
use crate::models::{Port, View};

/// Identifies one zone fetch; results carrying an older ticket are stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub zone: String,
    pub view: View,
    pub seq: u64,
}

/// Client-side timers. Generations let the loop ignore superseded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Coalesced refresh after change notifications.
    Refresh { generation: u64 },
    /// Switch panic mode off again.
    PanicAutoDisable { generation: u64 },
    /// One second of a confirmation countdown.
    ConfirmTick { generation: u64 },
}

/// Gateway operations that are not zone content mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetDefaultZone(String),
    AddZone(String),
    RemoveZone(String),
    Commit,
    Reload,
    SetPanic(bool),
    IpSetEntry { ipset: String, entry: String, op: Op },
    AddIpSet { name: String, kind: String },
    RemoveIpSet(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SetDefaultZone(z) => write!(f, "set default zone to {z}"),
            Action::AddZone(z) => write!(f, "create zone {z}"),
            Action::RemoveZone(z) => write!(f, "delete zone {z}"),
            Action::Commit => f.write_str("make runtime configuration permanent"),
            Action::Reload => f.write_str("reload firewalld"),
            Action::SetPanic(true) => f.write_str("enable panic mode"),
            Action::SetPanic(false) => f.write_str("disable panic mode"),
            Action::IpSetEntry { ipset, entry, op: Op::Add } => write!(f, "add {entry} to ipset {ipset}"),
            Action::IpSetEntry { ipset, entry, op: Op::Remove } => {
                write!(f, "remove {entry} from ipset {ipset}")
            }
            Action::AddIpSet { name, kind } => write!(f, "create ipset {name} ({kind})"),
            Action::RemoveIpSet(name) => write!(f, "delete ipset {name}"),
        }
    }
}

/// One unit of asynchronous work. Each posts exactly one message back,
/// except [`Command::Quit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Zone names of a view plus default and active zones.
    LoadZones { view: View },
    FetchZone { ticket: Ticket },
    LoadIpSets,
    FetchIpSet { name: String },
    LoadService { name: String },
    QueryPanic,
    ListBackups { zone: String },

    /// Snapshot `zone`; run `then` afterwards when present.
    CreateBackup {
        zone: String,
        description: Option<String>,
        then: Option<Box<Command>>,
    },
    Apply { step: Step, disposition: Disposition },
    ApplyTemplate {
        zone: String,
        view: View,
        template: String,
        services: Vec<String>,
        ports: Vec<Port>,
    },
    Perform(Action),
    RestoreBackup { zone: String, backup: Backup },
    RevertRestore { zone: String },

    /// Wait for the next change notification.
    Listen,
    Schedule { after: Duration, timer: Timer },
    Quit,
}
