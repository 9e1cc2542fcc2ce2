// Zonekeeper - Update
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! The state transition function of the dispatch loop.
//!
//! [`update`] is the only place the [`Model`] changes. It never blocks:
//! anything that touches the bus or the disk is returned as a [`Command`]
//! and comes back later as another [`Msg`].

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::keys;
use super::message::{Msg, ZoneList};
use super::model::{Feature, Model};
use super::overlays::{Countdown, Detail, Prompt};
use crate::backup::Backup;
use crate::error::{Error, Result};
use crate::firewall::{interfaces, FirewallSignal};
use crate::models::{IpSetInfo, ServiceInfo, View, Zone};
use crate::orchestrator::{Action, Command, Disposition, Step, Ticket, Timer};

/// Quiet period before notifications turn into a refresh.
const REFRESH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Commands issued once at startup.
pub fn init(model: &mut Model) -> Vec<Command> {
    vec![
        Command::LoadZones { view: model.view },
        Command::QueryPanic,
        Command::LoadIpSets,
        Command::Listen,
    ]
}

/// Apply one message and return the follow-up commands.
pub fn update(model: &mut Model, msg: Msg) -> Vec<Command> {
    match msg {
        Msg::Key(key) => keys::handle_key(model, key),
        Msg::Resize => Vec::new(),
        Msg::ZonesLoaded { view, result } => zones_loaded(model, view, result),
        Msg::ZoneFetched { ticket, result } => zone_fetched(model, ticket, result),
        Msg::Applied {
            step,
            disposition,
            touched,
            result,
        } => applied(model, step, disposition, touched, result),
        Msg::TemplateApplied {
            zone,
            view,
            template,
            applied,
            result,
        } => template_applied(model, &zone, view, &template, applied, result),
        Msg::BackupCreated { zone, result, then } => backup_created(model, zone, result, then),
        Msg::BackupsListed { zone, result } => backups_listed(model, &zone, result),
        Msg::Restored { zone, result } => restored(model, &zone, result),
        Msg::RestoreReverted { zone, result } => restore_reverted(model, &zone, result),
        Msg::ServiceLoaded { name, result } => service_loaded(model, &name, result),
        Msg::IpSetsLoaded(result) => ipsets_loaded(model, result),
        Msg::IpSetFetched { name, result } => ipset_fetched(model, &name, result),
        Msg::PanicState(result) => panic_state(model, result),
        Msg::Done { action, result } => done(model, action, result),
        Msg::Notified(signal) => notified(model, signal),
        Msg::Timer(timer) => timer_fired(model, timer),
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Log an error and show it in the status line.
pub(super) fn report(model: &mut Model, context: &str, err: &Error) {
    warn!("{}: {}", context, err);
    model.fail(format!("{context}: {err}"));
}

/// Load the selected zone into the slot for `view`.
///
/// Served from the cache when fresh. While a fetch is in flight the request
/// is remembered and issued once it completes.
pub(super) fn fetch(model: &mut Model, view: View) -> Vec<Command> {
    let Some(zone) = model.selected_zone().map(str::to_string) else {
        return Vec::new();
    };
    if model.slot(view).loading {
        model.slot_mut(view).refetch = true;
        return Vec::new();
    }
    if let Some(cached) = model.cache.get(&zone, view).cloned() {
        model.slot_mut(view).zone = Some(cached);
        model.clamp_item();
        return Vec::new();
    }

    let ticket = Ticket {
        zone,
        view,
        seq: model.next_seq(),
    };
    let slot = model.slot_mut(view);
    slot.loading = true;
    slot.pending = Some(ticket.clone());
    vec![Command::FetchZone { ticket }]
}

/// Forget both views of the selected zone; in-flight results become stale.
pub(super) fn reset_slots(model: &mut Model) {
    model.runtime = Default::default();
    model.permanent = Default::default();
    model.item = 0;
}

/// Drop cached copies of `zone` and reload both views if it is selected.
pub(super) fn refetch_zone(model: &mut Model, zone: &str) -> Vec<Command> {
    model.cache.invalidate(zone);
    if model.selected_zone() != Some(zone) {
        return Vec::new();
    }
    let mut commands = fetch(model, View::Runtime);
    commands.extend(fetch(model, View::Permanent));
    commands
}

/// Reload everything the screen shows.
pub(super) fn refresh_all(model: &mut Model) -> Vec<Command> {
    model.cache.clear();
    let mut commands = vec![Command::LoadZones { view: model.view }];
    commands.extend(fetch(model, View::Runtime));
    commands.extend(fetch(model, View::Permanent));
    if model.supports(Feature::PanicMode) {
        commands.push(Command::QueryPanic);
    }
    if model.supports(Feature::IpSets) {
        commands.push(Command::LoadIpSets);
    }
    commands
}

/// Start a confirmation countdown.
pub(super) fn start_countdown(model: &mut Model) -> (Countdown, Vec<Command>) {
    model.confirm_generation += 1;
    let countdown = Countdown {
        remaining: model.confirm_delay.as_secs(),
        generation: model.confirm_generation,
    };
    let commands = if countdown.is_unlocked() {
        Vec::new()
    } else {
        vec![confirm_tick(countdown.generation)]
    };
    (countdown, commands)
}

fn confirm_tick(generation: u64) -> Command {
    Command::Schedule {
        after: Duration::from_secs(1),
        timer: Timer::ConfirmTick { generation },
    }
}

// ─── Zones ───────────────────────────────────────────────────────────────────

fn zones_loaded(model: &mut Model, view: View, result: Result<ZoneList>) -> Vec<Command> {
    if view != model.view {
        debug!("Dropping zone list for {} view, now showing {}", view, model.view);
        return Vec::new();
    }
    let list = match result {
        Ok(list) => list,
        Err(e) => {
            report(model, "Loading zones failed", &e);
            return Vec::new();
        }
    };

    let previous = model.selected_zone().map(str::to_string);
    model.zones = list.names;
    model.default_zone = list.default_zone;
    model.active = list.active;
    model.daemon_version = list.version;
    model.selected = previous
        .as_deref()
        .and_then(|name| model.zones.iter().position(|z| z == name))
        .unwrap_or(0);

    if model.selected_zone() != previous.as_deref() {
        debug!("Selected zone changed to {:?}", model.selected_zone());
        reset_slots(model);
        model.detail = None;
    }
    if model.current().is_none() {
        let view = model.view;
        return fetch(model, view);
    }
    Vec::new()
}

fn zone_fetched(model: &mut Model, ticket: Ticket, result: Result<Zone>) -> Vec<Command> {
    let view = ticket.view;
    if model.slot(view).pending.as_ref() != Some(&ticket) {
        debug!(
            "Dropping stale result for zone {} ({}, #{})",
            ticket.zone, view, ticket.seq
        );
        return Vec::new();
    }

    let slot = model.slot_mut(view);
    slot.pending = None;
    slot.loading = false;
    let refetch = std::mem::take(&mut slot.refetch);

    let mut commands = Vec::new();
    match result {
        Ok(zone) => {
            if !refetch {
                model.cache.insert(view, zone.clone());
            }
            model.slot_mut(view).zone = Some(zone);
            model.clamp_item();
        }
        Err(e) => {
            report(model, &format!("Loading zone {} ({view})", ticket.zone), &e);
            if matches!(e, Error::InvalidZone { .. }) {
                commands.push(Command::LoadZones { view: model.view });
            }
        }
    }
    if refetch {
        commands.extend(fetch(model, view));
    }
    commands
}

// ─── Mutations ───────────────────────────────────────────────────────────────

fn applied(
    model: &mut Model,
    step: Step,
    disposition: Disposition,
    touched: bool,
    result: Result<()>,
) -> Vec<Command> {
    model.orchestrator.settle(&step, disposition, result.is_ok());

    match &result {
        Ok(()) => {
            let text = match disposition {
                Disposition::RecordRedo => format!("Undone: {}", step.inverse()),
                Disposition::RecordUndo => format!("Redone: {step}"),
                Disposition::Fresh | Disposition::RecordNone => format!("Applied: {step}"),
            };
            model.info(text);
        }
        Err(e) => report(model, &format!("Could not {}", step.describe()), e),
    }

    if touched {
        refetch_zone(model, step.zone())
    } else {
        Vec::new()
    }
}

fn template_applied(
    model: &mut Model,
    zone: &str,
    view: View,
    template: &str,
    applied: Vec<String>,
    result: Result<()>,
) -> Vec<Command> {
    let added = if applied.is_empty() {
        "nothing".to_string()
    } else {
        applied.join(", ")
    };
    match result {
        Ok(()) => {
            info!("Template {} applied to {} ({}): {}", template, zone, view, added);
            model.info(format!("Template {template} applied to {zone}: added {added}"));
        }
        Err(e) => report(
            model,
            &format!("Template {template} stopped after adding {added}"),
            &e,
        ),
    }
    if applied.is_empty() {
        Vec::new()
    } else {
        refetch_zone(model, zone)
    }
}

fn backup_created(
    model: &mut Model,
    zone: String,
    result: Result<Backup>,
    then: Option<Box<Command>>,
) -> Vec<Command> {
    let Some(then) = then else {
        // Manual backup: every failure is reported.
        match result {
            Ok(backup) => model.info(format!("Backup of {zone} saved ({})", backup.label())),
            Err(e) => report(model, &format!("Backup of {zone} failed"), &e),
        }
        return match &model.backup_browser {
            Some(browser) if browser.zone == zone => vec![Command::ListBackups { zone }],
            _ => Vec::new(),
        };
    };

    match result {
        Ok(backup) => {
            debug!("Automatic backup of {} at {}", zone, backup.path.display());
        }
        Err(e) if e.is_missing_backup_source() => {
            debug!("No persisted definition of {}, nothing to back up", zone);
        }
        Err(e) => {
            let mut dropped = vec![*then];
            dropped.extend(model.orchestrator.backup_failed(&zone));
            let context = match dropped.len() {
                1 => format!("Backup of {zone} failed, change not applied"),
                n => format!("Backup of {zone} failed, {n} changes not applied"),
            };
            for command in dropped {
                model.orchestrator.abandon(command);
            }
            report(model, &context, &e);
            return Vec::new();
        }
    }

    let mut commands = vec![*then];
    commands.extend(model.orchestrator.backup_done(&zone));
    commands
}

// ─── Backups ─────────────────────────────────────────────────────────────────

fn backups_listed(model: &mut Model, zone: &str, result: Result<Vec<Backup>>) -> Vec<Command> {
    let Some(browser) = model.backup_browser.as_mut().filter(|b| b.zone == zone) else {
        debug!("Dropping backup list for {}, browser closed", zone);
        return Vec::new();
    };
    match result {
        Ok(backups) => {
            browser.selected = browser.selected.min(backups.len().saturating_sub(1));
            browser.backups = Some(backups);
        }
        Err(e) => {
            browser.backups = Some(Vec::new());
            report(model, &format!("Listing backups of {zone}"), &e);
        }
    }
    Vec::new()
}

fn relist(model: &Model, zone: &str) -> Option<Command> {
    model
        .backup_browser
        .as_ref()
        .filter(|b| b.zone == zone)
        .map(|_| Command::ListBackups {
            zone: zone.to_string(),
        })
}

fn restored(model: &mut Model, zone: &str, result: Result<Option<PathBuf>>) -> Vec<Command> {
    match result {
        Ok(marker) => {
            let saved = match marker {
                Some(path) => format!("previous definition kept at {}", path.display()),
                None => "there was no previous definition".to_string(),
            };
            model.info(format!("Restored {zone}, {saved}. Reload firewalld to apply it."));
        }
        Err(e) => {
            report(model, &format!("Restoring {zone}"), &e);
            return Vec::new();
        }
    }
    let mut commands = refetch_zone(model, zone);
    commands.extend(relist(model, zone));
    commands
}

fn restore_reverted(model: &mut Model, zone: &str, result: Result<PathBuf>) -> Vec<Command> {
    match result {
        Ok(path) => model.info(format!(
            "Reverted last restore of {zone} ({}). Reload firewalld to apply it.",
            path.display()
        )),
        Err(e) => {
            report(model, &format!("Reverting restore of {zone}"), &e);
            return Vec::new();
        }
    }
    let mut commands = refetch_zone(model, zone);
    commands.extend(relist(model, zone));
    commands
}

// ─── Details ─────────────────────────────────────────────────────────────────

fn service_loaded(model: &mut Model, name: &str, result: Result<ServiceInfo>) -> Vec<Command> {
    let Some(Detail::Service { name: shown, info }) = model.detail.as_mut() else {
        return Vec::new();
    };
    if shown.as_str() != name {
        debug!("Dropping service {}, popup shows {}", name, shown);
        return Vec::new();
    }
    match result {
        Ok(service) => *info = Some(service),
        Err(e) => {
            model.detail = Some(Detail::Text {
                title: format!("Service {name}"),
                body: e.to_string(),
            });
        }
    }
    Vec::new()
}

fn ipsets_loaded(model: &mut Model, result: Result<Vec<String>>) -> Vec<Command> {
    match result {
        Ok(mut names) => {
            names.sort();
            model.ipsets = names;
            model.clamp_item();
        }
        Err(e) if e.is_unsupported() => {
            info!("IPSets not available: {}", e);
            model.unsupported.insert(Feature::IpSets);
        }
        Err(e) => report(model, "Loading ipsets", &e),
    }
    Vec::new()
}

fn ipset_fetched(model: &mut Model, name: &str, result: Result<IpSetInfo>) -> Vec<Command> {
    let Some(Detail::IpSet {
        name: shown,
        info,
        selected,
    }) = model.detail.as_mut()
    else {
        return Vec::new();
    };
    if shown.as_str() != name {
        return Vec::new();
    }
    match result {
        Ok(set) => {
            *selected = (*selected).min(set.entries.len().saturating_sub(1));
            *info = Some(set);
        }
        Err(e) => {
            model.detail = None;
            report(model, &format!("Loading ipset {name}"), &e);
        }
    }
    Vec::new()
}

// ─── Daemon-wide actions ─────────────────────────────────────────────────────

fn set_panic(model: &mut Model, enabled: bool) -> Vec<Command> {
    let was = model.panic;
    model.panic = enabled;
    if !enabled {
        // Cancels a pending auto-disable.
        model.panic_generation += 1;
        return Vec::new();
    }
    if was {
        return Vec::new();
    }
    match model.panic_timeout {
        Some(after) => {
            model.panic_generation += 1;
            vec![Command::Schedule {
                after,
                timer: Timer::PanicAutoDisable {
                    generation: model.panic_generation,
                },
            }]
        }
        None => Vec::new(),
    }
}

fn panic_state(model: &mut Model, result: Result<bool>) -> Vec<Command> {
    match result {
        Ok(enabled) => {
            model.panic = enabled;
            Vec::new()
        }
        Err(e) if e.is_unsupported() => {
            model.unsupported.insert(Feature::PanicMode);
            Vec::new()
        }
        Err(e) => {
            report(model, "Querying panic mode", &e);
            Vec::new()
        }
    }
}

fn done(model: &mut Model, action: Action, result: Result<()>) -> Vec<Command> {
    if let Err(e) = result {
        if matches!(action, Action::SetPanic(_)) && e.is_unsupported() {
            model.unsupported.insert(Feature::PanicMode);
        }
        report(model, &format!("Could not {action}"), &e);
        return Vec::new();
    }

    match action {
        Action::SetPanic(true) => {
            let commands = set_panic(model, true);
            match model.panic_timeout {
                Some(after) => model.info(format!(
                    "Panic mode enabled, switching off in {}s",
                    after.as_secs()
                )),
                None => model.info("Panic mode enabled"),
            }
            commands
        }
        Action::SetPanic(false) => {
            model.info("Panic mode disabled");
            set_panic(model, false)
        }
        Action::SetDefaultZone(_) | Action::AddZone(_) => {
            model.info(format!("Done: {action}"));
            vec![Command::LoadZones { view: model.view }]
        }
        Action::RemoveZone(zone) => {
            model.cache.invalidate(&zone);
            model.info(format!("Deleted zone {zone}"));
            vec![Command::LoadZones { view: model.view }]
        }
        Action::Commit | Action::Reload => {
            model.info(format!("Done: {action}"));
            refresh_all(model)
        }
        Action::IpSetEntry { ref ipset, .. } => {
            model.info(format!("Done: {action}"));
            match &model.detail {
                Some(Detail::IpSet { name, .. }) if name == ipset => {
                    vec![Command::FetchIpSet { name: ipset.clone() }]
                }
                _ => Vec::new(),
            }
        }
        Action::AddIpSet { .. } | Action::RemoveIpSet(_) => {
            model.info(format!("Done: {action}"));
            vec![Command::LoadIpSets]
        }
    }
}

// ─── Notifications and timers ────────────────────────────────────────────────

fn notified(model: &mut Model, signal: Option<FirewallSignal>) -> Vec<Command> {
    let Some(signal) = signal else {
        debug!("Change notifications ended");
        return Vec::new();
    };
    debug!("Signal {}.{} zone={:?}", signal.interface, signal.name, signal.zone);

    match signal.name.as_str() {
        "PanicModeEnabled" => model.panic = true,
        "PanicModeDisabled" => {
            set_panic(model, false);
        }
        _ => {}
    }

    let mut commands = vec![Command::Listen];
    if signal.is_global() {
        model.cache.clear();
    } else if let Some(zone) = &signal.zone {
        model.cache.invalidate(zone);
    }
    if signal.interface == interfaces::IPSET && model.supports(Feature::IpSets) {
        commands.push(Command::LoadIpSets);
    }

    model.refresh_generation += 1;
    commands.push(Command::Schedule {
        after: REFRESH_DEBOUNCE,
        timer: Timer::Refresh {
            generation: model.refresh_generation,
        },
    });
    commands
}

fn timer_fired(model: &mut Model, timer: Timer) -> Vec<Command> {
    match timer {
        Timer::Refresh { generation } if generation == model.refresh_generation => {
            let mut commands = vec![Command::LoadZones { view: model.view }];
            commands.extend(fetch(model, View::Runtime));
            commands.extend(fetch(model, View::Permanent));
            commands
        }
        Timer::PanicAutoDisable { generation } if generation == model.panic_generation && model.panic => {
            info!("Panic mode timeout reached");
            model.info("Panic mode timeout reached, disabling");
            vec![Command::Perform(Action::SetPanic(false))]
        }
        Timer::ConfirmTick { generation } => {
            let countdown = match (&mut model.prompt, &mut model.backup_browser) {
                (Some(Prompt::Confirm { countdown, .. }), _)
                    if countdown.generation == generation =>
                {
                    Some(countdown)
                }
                (_, Some(browser)) => browser
                    .pending
                    .as_mut()
                    .map(|(_, countdown)| countdown)
                    .filter(|c| c.generation == generation),
                _ => None,
            };
            match countdown {
                Some(countdown) => {
                    if countdown.tick() {
                        vec![confirm_tick(generation)]
                    } else {
                        Vec::new()
                    }
                }
                None => Vec::new(),
            }
        }
        other => {
            debug!("Ignoring superseded timer {:?}", other);
            Vec::new()
        }
    }
}
