// Zonekeeper - UI Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Frame rendering. Reads the model, never changes it.

mod popups;
mod theme;
mod zone;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Tabs},
    Frame,
};

use crate::app::{Model, Tab};
use crate::models::View;

/// Draw the whole screen.
pub fn render(frame: &mut Frame, model: &Model) {
    let [header, body, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header, model);

    let [sidebar, content] = Layout::horizontal([Constraint::Length(22), Constraint::Min(20)]).areas(body);
    render_zone_list(frame, sidebar, model);
    zone::render(frame, content, model);

    render_status(frame, status, model);
    popups::render(frame, model);
}

fn render_header(frame: &mut Frame, area: Rect, model: &Model) {
    let [tabs_area, view_area] = Layout::horizontal([Constraint::Min(10), Constraint::Length(30)]).areas(area);

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(format!(" {} ", t.title()))).collect();
    let selected = Tab::ALL.iter().position(|t| *t == model.tab).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(theme::dim())
        .highlight_style(theme::selected())
        .divider(Span::styled("│", theme::dim()));
    frame.render_widget(tabs, tabs_area);

    let mut spans = Vec::new();
    if model.panic {
        spans.push(Span::styled(" PANIC ", theme::error()));
    }
    let view_style = match model.view {
        View::Runtime => theme::success(),
        View::Permanent => theme::warning(),
    };
    spans.push(Span::styled(format!(" {} ", model.view.label().to_uppercase()), view_style));
    frame.render_widget(Paragraph::new(Line::from(spans)).right_aligned(), view_area);
}

fn render_zone_list(frame: &mut Frame, area: Rect, model: &Model) {
    let items: Vec<ListItem> = model
        .zones
        .iter()
        .map(|name| {
            let mut spans = vec![Span::raw(name.clone())];
            if *name == model.default_zone {
                spans.push(Span::styled(" (default)", theme::dim()));
            }
            if !model.bindings(name).is_empty() {
                spans.push(Span::styled(" ●", theme::success()));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .title(" Zones ")
        .title_style(theme::title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border());
    let list = List::new(items)
        .block(block)
        .highlight_style(theme::selected())
        .highlight_symbol("▸ ");
    let mut state = ListState::default().with_selected((!model.zones.is_empty()).then_some(model.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_status(frame: &mut Frame, area: Rect, model: &Model) {
    let line = match &model.status {
        Some(status) if status.error => Line::from(Span::styled(format!(" {}", status.text), theme::error())),
        Some(status) => Line::from(format!(" {}", status.text)),
        None => {
            let log = model.orchestrator.log();
            Line::from(vec![
                Span::styled(" ? help  q quit", theme::key_hint()),
                Span::styled(
                    format!("  │ undo {}  redo {}", log.undo_len(), log.redo_len()),
                    theme::dim(),
                ),
                Span::styled(
                    model
                        .selected_zone()
                        .filter(|zone| model.orchestrator.is_backup_pending(zone))
                        .map(|zone| format!("  │ backing up {zone}…"))
                        .unwrap_or_default(),
                    theme::warning(),
                ),
                Span::styled(
                    model
                        .daemon_version
                        .as_deref()
                        .map(|v| format!("  │ firewalld {v}"))
                        .unwrap_or_default(),
                    theme::dim(),
                ),
            ])
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// A rectangle of the given size centred in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::config::Settings;
    use crate::models::Zone;

    fn screen_text(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, model)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_renders_zone_and_view() {
        let mut model = Model::new(&Settings::default());
        model.zones = vec!["home".into(), "public".into()];
        model.default_zone = "public".into();
        let mut zone = Zone::new("home");
        zone.target = "default".into();
        zone.services = vec!["ssh".into()];
        model.runtime.zone = Some(zone);

        let text = screen_text(&model);
        assert!(text.contains("Zones"));
        assert!(text.contains("(default)"));
        assert!(text.contains("RUNTIME"));
        assert!(text.contains("ssh"));
    }

    #[test]
    fn test_centered_fits() {
        let area = Rect::new(0, 0, 40, 10);
        let inner = centered(area, 100, 100);
        assert!(inner.width <= 38 && inner.height <= 8);
    }
}
