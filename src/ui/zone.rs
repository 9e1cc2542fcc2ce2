// Zonekeeper - Zone Pane
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Content pane for the selected zone and tab.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::theme;
use crate::app::{Feature, Model, Tab};
use crate::firewall::zone_description;
use crate::models::{ServiceInfo, Zone};

pub fn render(frame: &mut Frame, area: Rect, model: &Model) {
    let title = match model.selected_zone() {
        Some(zone) => format!(" {} · {} ", zone, model.tab.title()),
        None => format!(" {} ", model.tab.title()),
    };
    let block = Block::default()
        .title(title)
        .title_style(theme::title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused());

    if model.tab == Tab::IpSets {
        render_ipsets(frame, area, block, model);
        return;
    }

    let Some(zone) = model.current() else {
        let text = if model.slot(model.view).loading || model.zones.is_empty() {
            "Loading…"
        } else {
            "No zone selected"
        };
        frame.render_widget(Paragraph::new(Span::styled(text, theme::dim())).block(block), area);
        return;
    };

    match model.tab {
        Tab::Overview => render_overview(frame, area, block, model, zone),
        tab => render_items(frame, area, block, model, item_lines(tab, zone)),
    }
}

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), theme::heading()),
        Span::raw(value.into()),
    ])
}

fn render_overview(frame: &mut Frame, area: Rect, block: Block, model: &Model, zone: &Zone) {
    let mut lines = vec![
        Line::from(Span::styled(zone.purpose().to_string(), theme::title())),
        Line::from(Span::styled(zone_description(&zone.name), theme::dim())),
        Line::default(),
        field("Target", zone.target.clone()),
        field("Masquerade", if zone.masquerade { "on" } else { "off" }),
        field("Forward", if zone.forward { "on" } else { "off" }),
    ];
    if zone.name == model.default_zone {
        lines.push(field("Default", "yes"));
    }

    let bound = model.bindings(&zone.name);
    lines.push(field(
        "Bound to",
        if bound.is_empty() {
            "nothing (inactive)".to_string()
        } else {
            bound.join(", ")
        },
    ));
    lines.push(Line::default());
    lines.push(field("Services", summary(&zone.services)));
    lines.push(field(
        "Ports",
        summary(&zone.ports.iter().map(|p| p.to_string()).collect::<Vec<_>>()),
    ));
    lines.push(field("Rich rules", zone.rich_rules.len().to_string()));
    lines.push(field(
        "Sources",
        summary(&zone.sources.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
    ));
    if !zone.forward_ports.is_empty() {
        lines.push(field(
            "Forwards",
            summary(&zone.forward_ports.iter().map(|f| f.to_string()).collect::<Vec<_>>()),
        ));
    }
    if !zone.icmp_blocks.is_empty() {
        let label = if zone.icmp_block_inversion { "ICMP allowed" } else { "ICMP blocked" };
        lines.push(field(label, summary(&zone.icmp_blocks)));
    }

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn summary(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// List rows for a content tab, with annotations where useful.
fn item_lines(tab: Tab, zone: &Zone) -> Vec<Line<'static>> {
    match tab {
        Tab::Ports => zone
            .ports
            .iter()
            .map(|port| {
                let mut spans = vec![Span::raw(port.key())];
                if let Some(service) = port.well_known_service() {
                    spans.push(Span::styled(format!("  {service}"), theme::dim()));
                }
                Line::from(spans)
            })
            .collect(),
        Tab::Services => zone
            .services
            .iter()
            .map(|name| {
                let risk = ServiceInfo::new(name).risk_level();
                let mut spans = vec![Span::raw(name.clone())];
                if risk != "low" {
                    spans.push(Span::styled(format!("  {risk} risk"), theme::risk(risk)));
                }
                Line::from(spans)
            })
            .collect(),
        tab => tab.items(zone).into_iter().map(Line::from).collect(),
    }
}

fn render_items(frame: &mut Frame, area: Rect, block: Block, model: &Model, lines: Vec<Line<'static>>) {
    if lines.is_empty() {
        let hint = format!("No {}s. Press a to add one.", model.tab.noun());
        frame.render_widget(Paragraph::new(Span::styled(hint, theme::dim())).block(block), area);
        return;
    }
    let list = List::new(lines.into_iter().map(ListItem::new))
        .block(block)
        .highlight_style(theme::selected())
        .highlight_symbol("▸ ");
    let mut state = ListState::default().with_selected(Some(model.item));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_ipsets(frame: &mut Frame, area: Rect, block: Block, model: &Model) {
    if !model.supports(Feature::IpSets) {
        let text = Span::styled("IPSets are not supported by this firewalld.", theme::warning());
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }
    let lines = model.ipsets.iter().cloned().map(Line::from).collect();
    render_items(frame, area, block, model, lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Port, Protocol};

    #[test]
    fn test_ports_are_annotated() {
        let mut zone = Zone::new("public");
        zone.ports = vec![Port::new("22", Protocol::Tcp), Port::new("40000", Protocol::Udp)];
        let lines = item_lines(Tab::Ports, &zone);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[1].spans.len(), 1);
    }

    #[test]
    fn test_summary() {
        assert_eq!(summary(&[]), "none");
        assert_eq!(summary(&["ssh".into(), "http".into()]), "ssh, http");
    }
}
