// Zonekeeper - Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! State owned by the dispatch loop.

use std::collections::HashSet;
use std::time::Duration;

use super::cache::ZoneCache;
use super::overlays::{BackupBrowser, Detail, Prompt, TemplatePicker};
use crate::config::{Settings, Template};
use crate::error::Result;
use crate::models::{Port, Source, View, Zone};
use crate::orchestrator::{Change, Orchestrator, Ticket};

/// Content tabs of the zone view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Overview,
    Services,
    Ports,
    RichRules,
    Interfaces,
    Sources,
    IpSets,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Overview,
        Tab::Services,
        Tab::Ports,
        Tab::RichRules,
        Tab::Interfaces,
        Tab::Sources,
        Tab::IpSets,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Services => "Services",
            Tab::Ports => "Ports",
            Tab::RichRules => "Rich rules",
            Tab::Interfaces => "Interfaces",
            Tab::Sources => "Sources",
            Tab::IpSets => "IPSets",
        }
    }

    /// Singular name of the items on this tab.
    pub fn noun(self) -> &'static str {
        match self {
            Tab::Overview => "zone",
            Tab::Services => "service",
            Tab::Ports => "port (e.g. 8080/tcp)",
            Tab::RichRules => "rich rule",
            Tab::Interfaces => "interface",
            Tab::Sources => "source (address, mac:, ipset:)",
            Tab::IpSets => "ipset",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    /// Whether the tab lists zone content that mutations apply to.
    pub fn is_zone_content(self) -> bool {
        !matches!(self, Tab::Overview | Tab::IpSets)
    }

    /// Items of `zone` listed on this tab.
    pub fn items(self, zone: &Zone) -> Vec<String> {
        match self {
            Tab::Services => zone.services.clone(),
            Tab::Ports => zone.ports.iter().map(Port::key).collect(),
            Tab::RichRules => zone.rich_rules.clone(),
            Tab::Interfaces => zone.interfaces.clone(),
            Tab::Sources => zone.sources.iter().map(Source::to_string).collect(),
            Tab::Overview | Tab::IpSets => Vec::new(),
        }
    }

    /// The change that names item `index` of `zone`.
    pub fn change_at(self, zone: &Zone, index: usize) -> Option<Change> {
        match self {
            Tab::Services => zone.services.get(index).cloned().map(Change::Service),
            Tab::Ports => zone.ports.get(index).cloned().map(Change::Port),
            Tab::RichRules => zone.rich_rules.get(index).cloned().map(Change::RichRule),
            Tab::Interfaces => zone.interfaces.get(index).cloned().map(Change::Interface),
            Tab::Sources => zone.sources.get(index).cloned().map(Change::Source),
            Tab::Overview | Tab::IpSets => None,
        }
    }

    /// Parse user input into a change for this tab.
    pub fn parse_change(self, input: &str) -> Result<Change> {
        let input = input.trim();
        match self {
            Tab::Services => Ok(Change::Service(input.to_string())),
            Tab::Ports => Ok(Change::Port(Port::parse(input)?)),
            Tab::RichRules => Ok(Change::RichRule(input.to_string())),
            Tab::Interfaces => Ok(Change::Interface(input.to_string())),
            Tab::Sources => Ok(Change::Source(Source::parse(input)?)),
            Tab::Overview | Tab::IpSets => Err(crate::error::Error::invalid(format!(
                "Nothing to add on the {} tab",
                self.title()
            ))),
        }
    }
}

/// One view of the selected zone.
#[derive(Debug, Clone, Default)]
pub struct Slot {
    pub zone: Option<Zone>,
    pub loading: bool,
    /// Another fetch was requested while one was in flight.
    pub refetch: bool,
    /// The fetch whose result this slot accepts.
    pub pending: Option<Ticket>,
}

/// Features the connected daemon turned out not to support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    PanicMode,
    IpSets,
}

/// Status line message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub error: bool,
}

/// Everything the loop knows. Changed only by `update`.
#[derive(Debug)]
pub struct Model {
    pub running: bool,
    pub view: View,
    pub tab: Tab,

    pub zones: Vec<String>,
    pub default_zone: String,
    pub active: Vec<(String, Vec<String>)>,
    pub daemon_version: Option<String>,
    pub selected: usize,
    /// Cursor within the current tab's list.
    pub item: usize,
    pub runtime: Slot,
    pub permanent: Slot,
    pub(super) seq: u64,

    pub ipsets: Vec<String>,
    pub panic: bool,
    pub unsupported: HashSet<Feature>,

    pub cache: ZoneCache,
    pub orchestrator: Orchestrator,
    pub templates: Vec<Template>,
    pub panic_timeout: Option<Duration>,
    pub confirm_delay: Duration,

    pub help: bool,
    pub template_picker: Option<TemplatePicker>,
    pub backup_browser: Option<BackupBrowser>,
    pub prompt: Option<Prompt>,
    pub detail: Option<Detail>,
    pub status: Option<Status>,

    pub(super) panic_generation: u64,
    pub(super) refresh_generation: u64,
    pub(super) confirm_generation: u64,
}

impl Model {
    pub fn new(settings: &Settings) -> Self {
        Self {
            running: true,
            view: if settings.start_permanent {
                View::Permanent
            } else {
                View::Runtime
            },
            tab: Tab::Overview,
            zones: Vec::new(),
            default_zone: String::new(),
            active: Vec::new(),
            daemon_version: None,
            selected: 0,
            item: 0,
            runtime: Slot::default(),
            permanent: Slot::default(),
            seq: 0,
            ipsets: Vec::new(),
            panic: false,
            unsupported: HashSet::new(),
            cache: ZoneCache::new(settings.cache_ttl()),
            orchestrator: Orchestrator::new(settings.undo_capacity),
            templates: settings.templates.clone(),
            panic_timeout: settings.panic_timeout(),
            confirm_delay: settings.confirm_delay(),
            help: false,
            template_picker: None,
            backup_browser: None,
            prompt: None,
            detail: None,
            status: None,
            panic_generation: 0,
            refresh_generation: 0,
            confirm_generation: 0,
        }
    }

    pub fn selected_zone(&self) -> Option<&str> {
        self.zones.get(self.selected).map(String::as_str)
    }

    pub fn slot(&self, view: View) -> &Slot {
        match view {
            View::Runtime => &self.runtime,
            View::Permanent => &self.permanent,
        }
    }

    pub fn slot_mut(&mut self, view: View) -> &mut Slot {
        match view {
            View::Runtime => &mut self.runtime,
            View::Permanent => &mut self.permanent,
        }
    }

    /// The selected zone in the current view, once fetched.
    pub fn current(&self) -> Option<&Zone> {
        self.slot(self.view).zone.as_ref()
    }

    /// Items shown on the current tab.
    pub fn items(&self) -> Vec<String> {
        match self.tab {
            Tab::IpSets => self.ipsets.clone(),
            tab => self.current().map(|z| tab.items(z)).unwrap_or_default(),
        }
    }

    /// Interfaces and sources bound to `zone` at runtime.
    pub fn bindings(&self, zone: &str) -> &[String] {
        self.active
            .iter()
            .find(|(name, _)| name == zone)
            .map(|(_, refs)| refs.as_slice())
            .unwrap_or(&[])
    }

    pub fn supports(&self, feature: Feature) -> bool {
        !self.unsupported.contains(&feature)
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            error: false,
        });
    }

    pub fn fail(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            error: true,
        });
    }

    pub(super) fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Keep the item cursor inside the current list.
    pub(super) fn clamp_item(&mut self) {
        let len = self.items().len();
        self.item = self.item.min(len.saturating_sub(1));
    }
}
