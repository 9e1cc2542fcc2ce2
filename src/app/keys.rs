// Zonekeeper - Key Handling
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Key routing through the overlay stack.
//!
//! Overlays are tried in a fixed order: help, template picker, backup
//! browser, prompt, item detail, then normal navigation. The first four
//! consume every key; the detail popup declines keys it does not use so
//! navigation still works while it is open.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::model::{Feature, Model, Tab};
use super::overlays::{
    step_index, BackupBrowser, BrowserAction, Confirmable, Detail, InputPurpose, Prompt, TemplatePicker,
};
use super::update::{fetch, refresh_all, report, reset_slots, start_countdown};
use crate::error::{Error, Result};
use crate::models::{validate_zone_name, Port};
use crate::orchestrator::{Action, Change, Command, Edit, Mutation, Op, Step};

pub(super) fn handle_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return quit(model);
    }
    if model.help {
        return help_key(model, key);
    }
    if model.template_picker.is_some() {
        return picker_key(model, key);
    }
    if model.backup_browser.is_some() {
        return browser_key(model, key);
    }
    if model.prompt.is_some() {
        return prompt_key(model, key);
    }
    if model.detail.is_some() {
        if let Some(commands) = detail_key(model, key) {
            return commands;
        }
    }
    normal_key(model, key)
}

fn quit(model: &mut Model) -> Vec<Command> {
    model.running = false;
    vec![Command::Quit]
}

// ─── Overlays ────────────────────────────────────────────────────────────────

fn help_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter) {
        model.help = false;
    }
    Vec::new()
}

fn picker_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    let len = model.templates.len();
    let Some(picker) = model.template_picker.as_mut() else {
        return Vec::new();
    };
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => picker.selected = step_index(picker.selected, -1, len),
        KeyCode::Down | KeyCode::Char('j') => picker.selected = step_index(picker.selected, 1, len),
        KeyCode::Enter => {
            let index = picker.selected;
            model.template_picker = None;
            return apply_template(model, index);
        }
        KeyCode::Esc | KeyCode::Char('q') => model.template_picker = None,
        _ => {}
    }
    Vec::new()
}

/// Apply template `index` to the current zone, leaving out what it already has.
fn apply_template(model: &mut Model, index: usize) -> Vec<Command> {
    let (Some(zone_name), Some(zone)) = (model.selected_zone().map(str::to_string), model.current()) else {
        model.fail("Zone is not loaded yet");
        return Vec::new();
    };
    let Some(template) = model.templates.get(index).cloned() else {
        return Vec::new();
    };

    let services: Vec<String> = template
        .services
        .iter()
        .filter(|s| !zone.has_service(s))
        .cloned()
        .collect();
    let ports: Vec<Port> = template
        .parsed_ports()
        .into_iter()
        .filter(|p| !zone.has_port(p))
        .collect();

    if services.is_empty() && ports.is_empty() {
        model.info(format!("{zone_name} already has everything in {}", template.name));
        return Vec::new();
    }

    model.info(format!("Applying template {} to {zone_name}", template.name));
    let command = Command::ApplyTemplate {
        zone: zone_name.clone(),
        view: model.view,
        template: template.name,
        services,
        ports,
    };
    model.orchestrator.guard(&zone_name, command).into_iter().collect()
}

fn browser_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    let Some(browser) = model.backup_browser.as_mut() else {
        return Vec::new();
    };

    if let Some((action, countdown)) = &browser.pending {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter if countdown.is_unlocked() => {
                let zone = browser.zone.clone();
                let command = match action {
                    BrowserAction::Restore(backup) => Command::RestoreBackup {
                        zone,
                        backup: backup.clone(),
                    },
                    BrowserAction::RevertRestore => Command::RevertRestore { zone },
                };
                browser.pending = None;
                return vec![command];
            }
            KeyCode::Char('n') | KeyCode::Esc => browser.pending = None,
            _ => {}
        }
        return Vec::new();
    }

    let len = browser.backups.as_ref().map_or(0, Vec::len);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => browser.selected = step_index(browser.selected, -1, len),
        KeyCode::Down | KeyCode::Char('j') => browser.selected = step_index(browser.selected, 1, len),
        KeyCode::Enter => {
            if let Some(backup) = browser.current().cloned() {
                let (countdown, commands) = start_countdown(model);
                if let Some(browser) = model.backup_browser.as_mut() {
                    browser.pending = Some((BrowserAction::Restore(backup), countdown));
                }
                return commands;
            }
        }
        KeyCode::Char('v') => {
            let (countdown, commands) = start_countdown(model);
            if let Some(browser) = model.backup_browser.as_mut() {
                browser.pending = Some((BrowserAction::RevertRestore, countdown));
            }
            return commands;
        }
        KeyCode::Esc | KeyCode::Char('q') => model.backup_browser = None,
        _ => {}
    }
    Vec::new()
}

fn prompt_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    match model.prompt.as_mut() {
        Some(Prompt::Input { buffer, .. }) => match key.code {
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Esc => model.prompt = None,
            KeyCode::Enter => {
                if let Some(Prompt::Input { purpose, buffer }) = model.prompt.take() {
                    return submit_input(model, purpose, buffer);
                }
            }
            _ => {}
        },
        Some(Prompt::Confirm { countdown, .. }) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if !countdown.is_unlocked() {
                    let wait = countdown.remaining;
                    model.info(format!("Wait {wait}s before confirming"));
                    return Vec::new();
                }
                if let Some(Prompt::Confirm { action, .. }) = model.prompt.take() {
                    return confirmed(model, action);
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                model.prompt = None;
                model.info("Cancelled");
            }
            _ => {}
        },
        None => {}
    }
    Vec::new()
}

/// Run a text prompt. Invalid input keeps the prompt open.
fn submit_input(model: &mut Model, purpose: InputPurpose, buffer: String) -> Vec<Command> {
    let text = buffer.trim().to_string();
    let result = match &purpose {
        InputPurpose::AddItem(tab) => tab.parse_change(&text).and_then(|change| {
            let step = Step::Apply(Mutation {
                zone: model.selected_zone().unwrap_or_default().to_string(),
                view: model.view,
                op: Op::Add,
                change,
            });
            try_submit(model, step)
        }),
        InputPurpose::EditItem { tab, old } => tab.parse_change(&text).and_then(|new| {
            let step = Step::Edit(Edit {
                zone: model.selected_zone().unwrap_or_default().to_string(),
                view: model.view,
                old: old.clone(),
                new,
            });
            try_submit(model, step)
        }),
        InputPurpose::AddZone => validate_zone_name(&text)
            .map(|()| vec![Command::Perform(Action::AddZone(text.clone()))]),
        InputPurpose::ManualBackup { zone } => Ok(vec![Command::CreateBackup {
            zone: zone.clone(),
            description: (!text.is_empty()).then(|| text.clone()),
            then: None,
        }]),
        InputPurpose::AddIpSet => {
            let mut parts = text.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(kind), None) => Ok(vec![Command::Perform(Action::AddIpSet {
                    name: name.to_string(),
                    kind: kind.to_string(),
                })]),
                _ => Err(Error::invalid("Expected '<name> <type>', e.g. 'blocklist hash:ip'")),
            }
        }
        InputPurpose::AddIpSetEntry { ipset } => Ok(vec![Command::Perform(Action::IpSetEntry {
            ipset: ipset.clone(),
            entry: text.clone(),
            op: Op::Add,
        })]),
    };

    match result {
        Ok(commands) => commands,
        Err(e) => {
            report(model, "Invalid input", &e);
            model.prompt = Some(Prompt::Input { purpose, buffer });
            Vec::new()
        }
    }
}

/// Hand a zone change to the orchestrator.
fn try_submit(model: &mut Model, step: Step) -> Result<Vec<Command>> {
    let label = step.to_string();
    let zone = step.zone().to_string();
    match model.orchestrator.submit(step)? {
        Some(command) => {
            debug!("Submitting {}", label);
            model.info(format!("Applying: {label}"));
            Ok(vec![command])
        }
        None => {
            model.info(format!("Waiting for the backup of {zone}: {label}"));
            Ok(Vec::new())
        }
    }
}

fn submit_step(model: &mut Model, step: Step) -> Vec<Command> {
    try_submit(model, step).unwrap_or_else(|e| {
        report(model, "Rejected", &e);
        Vec::new()
    })
}

fn confirmed(model: &mut Model, action: Confirmable) -> Vec<Command> {
    let command = match action {
        Confirmable::RemoveZone(zone) => {
            let command = Command::Perform(Action::RemoveZone(zone.clone()));
            return model.orchestrator.guard(&zone, command).into_iter().collect();
        }
        Confirmable::RemoveIpSet(name) => Command::Perform(Action::RemoveIpSet(name)),
        Confirmable::Commit => Command::Perform(Action::Commit),
        Confirmable::Reload => Command::Perform(Action::Reload),
        Confirmable::EnablePanic => Command::Perform(Action::SetPanic(true)),
    };
    vec![command]
}

fn open_confirm(model: &mut Model, action: Confirmable) -> Vec<Command> {
    let (countdown, commands) = start_countdown(model);
    model.prompt = Some(Prompt::Confirm { action, countdown });
    commands
}

fn open_input(model: &mut Model, purpose: InputPurpose, initial: String) {
    model.prompt = Some(Prompt::Input {
        purpose,
        buffer: initial,
    });
}

/// Keys of the detail popup; `None` passes the key on.
fn detail_key(model: &mut Model, key: KeyEvent) -> Option<Vec<Command>> {
    if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
        model.detail = None;
        return Some(Vec::new());
    }
    let Some(Detail::IpSet { name, info, selected }) = model.detail.as_mut() else {
        return None;
    };
    let entries = info.as_ref().map(|i| i.entries.as_slice()).unwrap_or(&[]);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => *selected = step_index(*selected, -1, entries.len()),
        KeyCode::Down | KeyCode::Char('j') => *selected = step_index(*selected, 1, entries.len()),
        KeyCode::Char('a') => {
            let ipset = name.clone();
            open_input(model, InputPurpose::AddIpSetEntry { ipset }, String::new());
        }
        KeyCode::Char('d') => {
            let Some(entry) = entries.get(*selected).cloned() else {
                return Some(Vec::new());
            };
            return Some(vec![Command::Perform(Action::IpSetEntry {
                ipset: name.clone(),
                entry,
                op: Op::Remove,
            })]);
        }
        _ => return None,
    }
    Some(Vec::new())
}

// ─── Normal navigation ───────────────────────────────────────────────────────

fn select_zone(model: &mut Model, index: usize) -> Vec<Command> {
    if index == model.selected || index >= model.zones.len() {
        return Vec::new();
    }
    model.selected = index;
    model.detail = None;
    reset_slots(model);
    let view = model.view;
    fetch(model, view)
}

fn switch_view(model: &mut Model) -> Vec<Command> {
    model.view = model.view.toggled();
    model.detail = None;
    model.item = 0;
    model.info(format!("Showing {} configuration", model.view));
    let view = model.view;
    let mut commands = vec![Command::LoadZones { view }];
    commands.extend(fetch(model, view));
    commands
}

fn switch_tab(model: &mut Model, tab: Tab) {
    model.tab = tab;
    model.detail = None;
    model.item = 0;
}

fn normal_key(model: &mut Model, key: KeyEvent) -> Vec<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('r') => redo(model),
            _ => Vec::new(),
        };
    }

    let zones = model.zones.len();
    match key.code {
        KeyCode::Char('q') => quit(model),
        KeyCode::Char('?') => {
            model.help = true;
            Vec::new()
        }

        KeyCode::Left | KeyCode::Char('h') => {
            let index = step_index(model.selected, -1, zones);
            select_zone(model, index)
        }
        KeyCode::Right | KeyCode::Char('l') => {
            let index = step_index(model.selected, 1, zones);
            select_zone(model, index)
        }
        KeyCode::Up | KeyCode::Char('k') => {
            model.item = step_index(model.item, -1, model.items().len());
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            model.item = step_index(model.item, 1, model.items().len());
            Vec::new()
        }
        KeyCode::Tab => {
            let tab = model.tab.next();
            switch_tab(model, tab);
            Vec::new()
        }
        KeyCode::BackTab => {
            let tab = model.tab.prev();
            switch_tab(model, tab);
            Vec::new()
        }
        KeyCode::Char('p') => switch_view(model),
        KeyCode::Char('r') | KeyCode::F(5) => {
            if let Some(zone) = model.selected_zone().map(str::to_string) {
                model.cache.invalidate(&zone);
            }
            model.info("Refreshing");
            refresh_all(model)
        }

        KeyCode::Enter => open_detail(model),
        KeyCode::Char('a') => add_item(model),
        KeyCode::Char('d') | KeyCode::Delete => remove_item(model),
        KeyCode::Char('e') => edit_item(model),
        KeyCode::Char('m') => toggle_masquerade(model),
        KeyCode::Char('u') => undo(model),
        KeyCode::Char('U') => redo(model),

        KeyCode::Char('D') => set_default_zone(model),
        KeyCode::Char('Z') => {
            open_input(model, InputPurpose::AddZone, String::new());
            Vec::new()
        }
        KeyCode::Char('X') => match model.selected_zone().map(str::to_string) {
            Some(zone) => open_confirm(model, Confirmable::RemoveZone(zone)),
            None => Vec::new(),
        },
        KeyCode::Char('c') => open_confirm(model, Confirmable::Commit),
        KeyCode::Char('R') => open_confirm(model, Confirmable::Reload),
        KeyCode::Char('P') => toggle_panic(model),

        KeyCode::Char('t') => {
            if model.current().is_none() {
                model.fail("Zone is not loaded yet");
            } else if model.templates.is_empty() {
                model.info("No templates configured");
            } else {
                model.template_picker = Some(TemplatePicker::default());
            }
            Vec::new()
        }
        KeyCode::Char('b') => match model.selected_zone().map(str::to_string) {
            Some(zone) => {
                model.backup_browser = Some(BackupBrowser::new(&zone));
                vec![Command::ListBackups { zone }]
            }
            None => Vec::new(),
        },
        KeyCode::Char('B') => {
            if let Some(zone) = model.selected_zone().map(str::to_string) {
                open_input(model, InputPurpose::ManualBackup { zone }, String::new());
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn open_detail(model: &mut Model) -> Vec<Command> {
    let Some(item) = model.items().get(model.item).cloned() else {
        return Vec::new();
    };
    match model.tab {
        Tab::Services => {
            model.detail = Some(Detail::Service {
                name: item.clone(),
                info: None,
            });
            vec![Command::LoadService { name: item }]
        }
        Tab::IpSets => {
            model.detail = Some(Detail::IpSet {
                name: item.clone(),
                info: None,
                selected: 0,
            });
            vec![Command::FetchIpSet { name: item }]
        }
        tab => {
            model.detail = Some(Detail::Text {
                title: tab.title().to_string(),
                body: item,
            });
            Vec::new()
        }
    }
}

fn add_item(model: &mut Model) -> Vec<Command> {
    match model.tab {
        Tab::IpSets if model.supports(Feature::IpSets) => {
            open_input(model, InputPurpose::AddIpSet, String::new());
        }
        Tab::IpSets => model.fail("IPSets are not supported by this firewalld"),
        tab if tab.is_zone_content() => {
            if model.current().is_some() {
                open_input(model, InputPurpose::AddItem(tab), String::new());
            } else {
                model.fail("Zone is not loaded yet");
            }
        }
        _ => model.info("Select a tab with items to add"),
    }
    Vec::new()
}

fn remove_item(model: &mut Model) -> Vec<Command> {
    if model.tab == Tab::IpSets {
        return match model.ipsets.get(model.item).cloned() {
            Some(name) => open_confirm(model, Confirmable::RemoveIpSet(name)),
            None => Vec::new(),
        };
    }
    let (Some(zone), Some(change)) = (
        model.selected_zone().map(str::to_string),
        model.current().and_then(|z| model.tab.change_at(z, model.item)),
    ) else {
        return Vec::new();
    };
    let step = Step::Apply(Mutation {
        zone,
        view: model.view,
        op: Op::Remove,
        change,
    });
    submit_step(model, step)
}

fn edit_item(model: &mut Model) -> Vec<Command> {
    let tab = model.tab;
    let Some(old) = model.current().and_then(|z| tab.change_at(z, model.item)) else {
        return Vec::new();
    };
    let initial = old.value();
    open_input(model, InputPurpose::EditItem { tab, old }, initial);
    Vec::new()
}

fn toggle_masquerade(model: &mut Model) -> Vec<Command> {
    let (Some(zone), Some(enabled)) = (
        model.selected_zone().map(str::to_string),
        model.current().map(|z| z.masquerade),
    ) else {
        model.fail("Zone is not loaded yet");
        return Vec::new();
    };
    let step = Step::Apply(Mutation {
        zone,
        view: model.view,
        op: if enabled { Op::Remove } else { Op::Add },
        change: Change::Masquerade,
    });
    submit_step(model, step)
}

fn undo(model: &mut Model) -> Vec<Command> {
    match model.orchestrator.undo() {
        Some((label, command)) => {
            model.info(format!("Undoing: {label}"));
            command.into_iter().collect()
        }
        None => {
            model.info("Nothing to undo");
            Vec::new()
        }
    }
}

fn redo(model: &mut Model) -> Vec<Command> {
    match model.orchestrator.redo() {
        Some((label, command)) => {
            model.info(format!("Redoing: {label}"));
            command.into_iter().collect()
        }
        None => {
            model.info("Nothing to redo");
            Vec::new()
        }
    }
}

fn set_default_zone(model: &mut Model) -> Vec<Command> {
    let Some(zone) = model.selected_zone().map(str::to_string) else {
        return Vec::new();
    };
    if zone == model.default_zone {
        model.info(format!("{zone} is already the default zone"));
        return Vec::new();
    }
    vec![Command::Perform(Action::SetDefaultZone(zone))]
}

fn toggle_panic(model: &mut Model) -> Vec<Command> {
    if !model.supports(Feature::PanicMode) {
        model.fail("Panic mode is not supported by this firewalld");
        return Vec::new();
    }
    if model.panic {
        vec![Command::Perform(Action::SetPanic(false))]
    } else {
        open_confirm(model, Confirmable::EnablePanic)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Settings;
    use crate::models::{IpSetInfo, View, Zone};
    use crate::orchestrator::Disposition;

    fn press(model: &mut Model, code: KeyCode) -> Vec<Command> {
        handle_key(model, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn model_with_zone() -> Model {
        let mut model = Model::new(&Settings {
            confirm_delay_secs: 0,
            ..Settings::default()
        });
        model.zones = vec!["public".into()];
        let mut zone = Zone::new("public");
        zone.rich_rules = vec!["rule family=ipv4 accept".into()];
        model.runtime.zone = Some(zone);
        model.orchestrator.guard("public", Command::Quit);
        model.orchestrator.backup_done("public");
        model
    }

    #[test]
    fn test_edit_prefills_and_submits_edit_step() {
        let mut model = model_with_zone();
        model.tab = Tab::RichRules;
        press(&mut model, KeyCode::Char('e'));
        match &model.prompt {
            Some(Prompt::Input { buffer, .. }) => assert_eq!(buffer, "rule family=ipv4 accept"),
            other => panic!("expected an edit prompt, got {other:?}"),
        }
        for _ in 0.."accept".len() {
            press(&mut model, KeyCode::Backspace);
        }
        for c in "drop".chars() {
            press(&mut model, KeyCode::Char(c));
        }
        let commands = press(&mut model, KeyCode::Enter);
        assert_eq!(
            commands,
            vec![Command::Apply {
                step: Step::Edit(Edit {
                    zone: "public".into(),
                    view: View::Runtime,
                    old: Change::RichRule("rule family=ipv4 accept".into()),
                    new: Change::RichRule("rule family=ipv4 drop".into()),
                }),
                disposition: Disposition::Fresh,
            }]
        );
    }

    #[test]
    fn test_invalid_input_keeps_prompt_open() {
        let mut model = model_with_zone();
        model.tab = Tab::Ports;
        press(&mut model, KeyCode::Char('a'));
        for c in "99999/tcp".chars() {
            press(&mut model, KeyCode::Char(c));
        }
        assert!(press(&mut model, KeyCode::Enter).is_empty());
        assert!(model.prompt.is_some());
        assert!(model.status.as_ref().unwrap().error);
        press(&mut model, KeyCode::Esc);
        assert!(model.prompt.is_none());
    }

    #[test]
    fn test_zero_delay_confirm_runs_at_once() {
        let mut model = model_with_zone();
        assert!(press(&mut model, KeyCode::Char('R')).is_empty());
        assert_eq!(
            press(&mut model, KeyCode::Char('y')),
            vec![Command::Perform(Action::Reload)]
        );
    }

    #[test]
    fn test_detail_declines_navigation_keys() {
        let mut model = model_with_zone();
        model.tab = Tab::IpSets;
        model.ipsets = vec!["blocklist".into()];
        press(&mut model, KeyCode::Enter);
        if let Some(Detail::IpSet { info, .. }) = model.detail.as_mut() {
            *info = Some(IpSetInfo {
                name: "blocklist".into(),
                entries: vec!["10.0.0.1".into(), "10.0.0.2".into()],
            });
        }
        press(&mut model, KeyCode::Down);
        assert_eq!(
            press(&mut model, KeyCode::Char('d')),
            vec![Command::Perform(Action::IpSetEntry {
                ipset: "blocklist".into(),
                entry: "10.0.0.2".into(),
                op: Op::Remove,
            })]
        );

        // Tab is not a popup key: it switches tabs and closes the popup.
        press(&mut model, KeyCode::Tab);
        assert!(model.detail.is_none());
        assert_eq!(model.tab, Tab::Overview);
    }

    #[test]
    fn test_masquerade_toggle_direction() {
        let mut model = model_with_zone();
        let commands = press(&mut model, KeyCode::Char('m'));
        assert!(matches!(
            commands.as_slice(),
            [Command::Apply { step: Step::Apply(Mutation { op: Op::Add, change: Change::Masquerade, .. }), .. }]
        ));
        if let Some(zone) = model.runtime.zone.as_mut() {
            zone.masquerade = true;
        }
        let commands = press(&mut model, KeyCode::Char('m'));
        assert!(matches!(
            commands.as_slice(),
            [Command::Apply { step: Step::Apply(Mutation { op: Op::Remove, .. }), .. }]
        ));
    }

    #[test]
    fn test_view_toggle_loads_other_view() {
        let mut model = model_with_zone();
        let commands = press(&mut model, KeyCode::Char('p'));
        assert_eq!(model.view, View::Permanent);
        assert_eq!(commands[0], Command::LoadZones { view: View::Permanent });
        assert!(matches!(
            &commands[1],
            Command::FetchZone { ticket } if ticket.view == View::Permanent && ticket.zone == "public"
        ));
    }

    #[test]
    fn test_restore_from_browser() {
        let mut model = model_with_zone();
        let commands = press(&mut model, KeyCode::Char('b'));
        assert_eq!(commands, vec![Command::ListBackups { zone: "public".into() }]);
        let backup = crate::backup::Backup {
            path: "/tmp/public--20260101-000000-000.xml".into(),
            zone: "public".into(),
            timestamp: chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
            size: 7,
            description: None,
        };
        if let Some(browser) = model.backup_browser.as_mut() {
            browser.backups = Some(vec![backup.clone()]);
        }

        // Keys go to the browser, not to navigation.
        assert!(press(&mut model, KeyCode::Char('Z')).is_empty());
        assert!(model.prompt.is_none());
        assert!(model.backup_browser.is_some());

        press(&mut model, KeyCode::Enter);
        assert_eq!(
            press(&mut model, KeyCode::Char('y')),
            vec![Command::RestoreBackup {
                zone: "public".into(),
                backup,
            }]
        );
    }
}
