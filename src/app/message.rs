// Zonekeeper - Messages
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Events delivered to the dispatch loop.

use std::path::PathBuf;

use crossterm::event::KeyEvent;

use crate::backup::Backup;
use crate::error::Result;
use crate::firewall::FirewallSignal;
use crate::models::{IpSetInfo, ServiceInfo, View, Zone};
use crate::orchestrator::{Action, Command, Disposition, Step, Ticket, Timer};

/// Zone names of one view with the daemon-wide zone state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneList {
    pub names: Vec<String>,
    pub default_zone: String,
    /// Active zones and the interfaces and sources bound to them.
    pub active: Vec<(String, Vec<String>)>,
    pub version: Option<String>,
}

/// Everything the loop reacts to.
#[derive(Debug)]
pub enum Msg {
    Key(KeyEvent),
    Resize,

    ZonesLoaded {
        view: View,
        result: Result<ZoneList>,
    },
    ZoneFetched {
        ticket: Ticket,
        result: Result<Zone>,
    },
    Applied {
        step: Step,
        disposition: Disposition,
        /// The backend was changed, even if the step as a whole failed.
        touched: bool,
        result: Result<()>,
    },
    TemplateApplied {
        zone: String,
        view: View,
        template: String,
        applied: Vec<String>,
        result: Result<()>,
    },
    BackupCreated {
        zone: String,
        result: Result<Backup>,
        /// The deferred command; `None` for manual backups.
        then: Option<Box<Command>>,
    },
    BackupsListed {
        zone: String,
        result: Result<Vec<Backup>>,
    },
    Restored {
        zone: String,
        result: Result<Option<PathBuf>>,
    },
    RestoreReverted {
        zone: String,
        result: Result<PathBuf>,
    },
    ServiceLoaded {
        name: String,
        result: Result<ServiceInfo>,
    },
    IpSetsLoaded(Result<Vec<String>>),
    IpSetFetched {
        name: String,
        result: Result<IpSetInfo>,
    },
    PanicState(Result<bool>),
    Done {
        action: Action,
        result: Result<()>,
    },
    /// A change notification, or `None` once the subscription ended.
    Notified(Option<FirewallSignal>),
    Timer(Timer),
}
