// Zonekeeper - Theme
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Colors and styles.

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Cyan;
pub const SUCCESS: Color = Color::Green;
pub const WARNING: Color = Color::Yellow;
pub const ERROR: Color = Color::Red;
pub const DIM: Color = Color::DarkGray;

pub fn title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn heading() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn dim() -> Style {
    Style::default().fg(DIM)
}

pub fn selected() -> Style {
    Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
}

pub fn border() -> Style {
    Style::default().fg(DIM)
}

pub fn border_focused() -> Style {
    Style::default().fg(ACCENT)
}

pub fn success() -> Style {
    Style::default().fg(SUCCESS)
}

pub fn warning() -> Style {
    Style::default().fg(WARNING)
}

pub fn error() -> Style {
    Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
}

pub fn key_hint() -> Style {
    Style::default().fg(DIM)
}

/// Style for a service risk level.
pub fn risk(level: &str) -> Style {
    match level {
        "high" => error(),
        "medium" => warning(),
        _ => success(),
    }
}
