// Zonekeeper - Overlays
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Modal overlays drawn on top of the zone view.

use crate::backup::Backup;
use crate::models::{IpSetInfo, ServiceInfo};
use crate::orchestrator::Change;

use super::model::Tab;

/// A confirmation that unlocks once its countdown reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub remaining: u64,
    pub generation: u64,
}

impl Countdown {
    pub fn is_unlocked(&self) -> bool {
        self.remaining == 0
    }

    /// Count one second down. Returns whether another tick is needed.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }
}

/// What a text prompt collects.
#[derive(Debug, Clone, PartialEq)]
pub enum InputPurpose {
    AddItem(Tab),
    EditItem { tab: Tab, old: Change },
    AddZone,
    ManualBackup { zone: String },
    AddIpSet,
    AddIpSetEntry { ipset: String },
}

impl InputPurpose {
    pub fn title(&self) -> String {
        match self {
            InputPurpose::AddItem(tab) => format!("Add {}", tab.noun()),
            InputPurpose::EditItem { tab, .. } => format!("Edit {}", tab.noun()),
            InputPurpose::AddZone => "New zone name".to_string(),
            InputPurpose::ManualBackup { zone } => format!("Backup description for {zone} (optional)"),
            InputPurpose::AddIpSet => "New ipset: <name> <type>, e.g. blocklist hash:ip".to_string(),
            InputPurpose::AddIpSetEntry { ipset } => format!("Add entry to {ipset}"),
        }
    }
}

/// Destructive operations that need a confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmable {
    RemoveZone(String),
    RemoveIpSet(String),
    Commit,
    Reload,
    EnablePanic,
}

impl Confirmable {
    pub fn question(&self) -> String {
        match self {
            Confirmable::RemoveZone(zone) => format!("Delete zone {zone} permanently?"),
            Confirmable::RemoveIpSet(name) => format!("Delete ipset {name} permanently?"),
            Confirmable::Commit => "Overwrite the permanent configuration with the runtime one?".to_string(),
            Confirmable::Reload => "Reload firewalld? Runtime-only changes are lost.".to_string(),
            Confirmable::EnablePanic => "Enable panic mode? All network traffic will be dropped.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Input { purpose: InputPurpose, buffer: String },
    Confirm { action: Confirmable, countdown: Countdown },
}

/// Template picker state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePicker {
    pub selected: usize,
}

/// What a backup browser confirmation would run.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Restore(Backup),
    RevertRestore,
}

/// Backups of one zone, with restore.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupBrowser {
    pub zone: String,
    /// `None` while the listing is in flight.
    pub backups: Option<Vec<Backup>>,
    pub selected: usize,
    pub pending: Option<(BrowserAction, Countdown)>,
}

impl BackupBrowser {
    pub fn new(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
            backups: None,
            selected: 0,
            pending: None,
        }
    }

    pub fn current(&self) -> Option<&Backup> {
        self.backups.as_ref()?.get(self.selected)
    }
}

/// Item detail popup.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    /// `info` is `None` until the definition is read.
    Service { name: String, info: Option<ServiceInfo> },
    IpSet { name: String, info: Option<IpSetInfo>, selected: usize },
    Text { title: String, body: String },
}

impl Detail {
    pub fn title(&self) -> String {
        match self {
            Detail::Service { name, .. } => format!("Service {name}"),
            Detail::IpSet { name, .. } => format!("IPSet {name}"),
            Detail::Text { title, .. } => title.clone(),
        }
    }
}

/// Move a list cursor by `delta`, clamped to `len`.
pub fn step_index(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    index.saturating_add_signed(delta).min(len - 1)
}
