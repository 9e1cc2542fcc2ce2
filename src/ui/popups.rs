// Zonekeeper - Popups
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Overlays drawn above the main screen, in the order keys reach them.

use ratatui::{
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::{centered, theme};
use crate::app::overlays::{BackupBrowser, BrowserAction, Countdown, Detail, Prompt};
use crate::app::Model;

const HELP: &[(&str, &str)] = &[
    ("h / l", "Previous / next zone"),
    ("j / k", "Move in list"),
    ("Tab / S-Tab", "Next / previous tab"),
    ("p", "Toggle runtime / permanent"),
    ("r / F5", "Refresh"),
    ("Enter", "Details"),
    ("a / d / e", "Add / remove / edit item"),
    ("m", "Toggle masquerade"),
    ("u / U", "Undo / redo"),
    ("D", "Make zone the default"),
    ("Z / X", "New zone / delete zone"),
    ("c", "Commit runtime to permanent"),
    ("R", "Reload firewalld"),
    ("P", "Toggle panic mode"),
    ("t", "Apply a template"),
    ("b / B", "Backups / back up now"),
    ("?", "Toggle this help"),
    ("q", "Quit"),
];

/// Draw every open overlay; the one that takes keys is drawn last.
pub fn render(frame: &mut Frame, model: &Model) {
    if let Some(detail) = &model.detail {
        render_detail(frame, detail);
    }
    if let Some(prompt) = &model.prompt {
        render_prompt(frame, prompt);
    }
    if let Some(browser) = &model.backup_browser {
        render_browser(frame, browser);
    }
    if let Some(picker) = &model.template_picker {
        render_templates(frame, model, picker.selected);
    }
    if model.help {
        render_help(frame);
    }
}

fn popup(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title.into()))
        .title_style(theme::title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
}

fn render_help(frame: &mut Frame) {
    let area = centered(frame.area(), 52, HELP.len() as u16 + 2);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:>12}  "), theme::heading()),
                Span::raw(*action),
            ])
        })
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(popup("Keys")), area);
}

fn countdown_hint(countdown: &Countdown) -> Span<'static> {
    if countdown.is_unlocked() {
        Span::styled("[y] confirm  [n] cancel", theme::warning())
    } else {
        Span::styled(format!("Wait {}s…  [n] cancel", countdown.remaining), theme::dim())
    }
}

fn render_prompt(frame: &mut Frame, prompt: &Prompt) {
    let area = centered(frame.area(), 64, 5);
    let (title, lines) = match prompt {
        Prompt::Input { purpose, buffer } => (
            purpose.title(),
            vec![
                Line::from(vec![Span::raw(buffer.clone()), Span::styled("▏", theme::title())]),
                Line::default(),
                Line::from(Span::styled("[Enter] submit  [Esc] cancel", theme::key_hint())),
            ],
        ),
        Prompt::Confirm { action, countdown } => (
            "Confirm".to_string(),
            vec![
                Line::from(action.question()),
                Line::default(),
                Line::from(countdown_hint(countdown)),
            ],
        ),
    };
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(popup(title)).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_templates(frame: &mut Frame, model: &Model, selected: usize) {
    let area = centered(frame.area(), 60, model.templates.len() as u16 * 2 + 4);
    frame.render_widget(Clear, area);

    if model.templates.is_empty() {
        let text = Span::styled("No templates configured.", theme::dim());
        frame.render_widget(Paragraph::new(text).block(popup("Templates")), area);
        return;
    }

    let items: Vec<ListItem> = model
        .templates
        .iter()
        .map(|template| {
            let mut contents: Vec<String> = template.services.clone();
            contents.extend(template.ports.iter().cloned());
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(template.name.clone(), theme::heading()),
                    Span::styled(format!("  {}", template.description), theme::dim()),
                ]),
                Line::from(Span::styled(format!("  {}", contents.join(", ")), theme::dim())),
            ])
        })
        .collect();
    let title = match model.selected_zone() {
        Some(zone) => format!("Apply template to {zone}"),
        None => "Templates".to_string(),
    };
    let list = List::new(items)
        .block(popup(title))
        .highlight_style(theme::selected())
        .highlight_symbol("▸ ");
    let mut state = ListState::default().with_selected(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_browser(frame: &mut Frame, browser: &BackupBrowser) {
    let area = centered(frame.area(), 70, 18);
    frame.render_widget(Clear, area);
    let block = popup(format!("Backups of {}", browser.zone));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [list_area, footer] = Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(inner);

    match &browser.backups {
        None => frame.render_widget(Paragraph::new(Span::styled("Loading…", theme::dim())), list_area),
        Some(backups) if backups.is_empty() => frame.render_widget(
            Paragraph::new(Span::styled("No backups yet. Press B in the main view.", theme::dim())),
            list_area,
        ),
        Some(backups) => {
            let items: Vec<ListItem> = backups
                .iter()
                .map(|b| {
                    ListItem::new(Line::from(vec![
                        Span::raw(b.label()),
                        Span::styled(format!("  {} B", b.size), theme::dim()),
                    ]))
                })
                .collect();
            let list = List::new(items)
                .highlight_style(theme::selected())
                .highlight_symbol("▸ ");
            let mut state = ListState::default().with_selected(Some(browser.selected));
            frame.render_stateful_widget(list, list_area, &mut state);
        }
    }

    let footer_lines = match &browser.pending {
        Some((action, countdown)) => {
            let question = match action {
                BrowserAction::Restore(backup) => format!(
                    "Restore {} from {}? Reload to apply.",
                    backup.zone,
                    backup.timestamp.format("%Y-%m-%d %H:%M:%S")
                ),
                BrowserAction::RevertRestore => format!("Undo the last restore of {}?", browser.zone),
            };
            vec![Line::from(Span::styled(question, theme::warning())), Line::from(countdown_hint(countdown))]
        }
        None => vec![Line::from(Span::styled(
            "[Enter] restore  [v] revert last restore  [Esc] close",
            theme::key_hint(),
        ))],
    };
    frame.render_widget(Paragraph::new(footer_lines), footer);
}

fn detail_lines(detail: &Detail) -> Vec<Line<'static>> {
    match detail {
        Detail::Service { info: None, .. } | Detail::IpSet { info: None, .. } => {
            vec![Line::from(Span::styled("Loading…", theme::dim()))]
        }
        Detail::Service { info: Some(info), .. } => {
            let risk = info.risk_level();
            let mut lines = vec![
                Line::from(info.human_description().to_string()),
                Line::default(),
                Line::from(vec![
                    Span::styled("Risk       ", theme::heading()),
                    Span::styled(risk, theme::risk(risk)),
                ]),
            ];
            let ports = info.ports_summary();
            if !ports.is_empty() {
                lines.push(Line::from(vec![Span::styled("Ports      ", theme::heading()), Span::raw(ports)]));
            }
            if !info.protocols.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("Protocols  ", theme::heading()),
                    Span::raw(info.protocols.join(", ")),
                ]));
            }
            if !info.modules.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("Helpers    ", theme::heading()),
                    Span::raw(info.modules.join(", ")),
                ]));
            }
            if !info.includes.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("Includes   ", theme::heading()),
                    Span::raw(info.includes.join(", ")),
                ]));
            }
            lines
        }
        Detail::IpSet { info: Some(info), .. } if info.entries.is_empty() => vec![
            Line::from(Span::styled("No entries.", theme::dim())),
            Line::default(),
            Line::from(Span::styled("[a] add entry  [Esc] close", theme::key_hint())),
        ],
        Detail::IpSet { info: Some(info), .. } => info.entries.iter().cloned().map(Line::from).collect(),
        Detail::Text { body, .. } => body.lines().map(|l| Line::from(l.to_string())).collect(),
    }
}

fn render_detail(frame: &mut Frame, detail: &Detail) {
    let area = centered(frame.area(), 64, 16);
    frame.render_widget(Clear, area);
    let block = popup(detail.title());

    if let Detail::IpSet { info: Some(info), selected, .. } = detail {
        if !info.entries.is_empty() {
            let list = List::new(detail_lines(detail).into_iter().map(ListItem::new))
                .block(block.title_bottom(Line::from(" [a] add  [d] remove  [Esc] close ").style(theme::key_hint())))
                .highlight_style(theme::selected())
                .highlight_symbol("▸ ");
            let mut state = ListState::default().with_selected(Some(*selected));
            frame.render_stateful_widget(list, area, &mut state);
            return;
        }
    }

    frame.render_widget(
        Paragraph::new(detail_lines(detail)).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
