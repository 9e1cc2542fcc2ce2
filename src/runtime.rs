// Zonekeeper - Event Loop
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! The single-threaded dispatch loop.
//!
//! Terminal events and command completions are merged into one stream of
//! [`Msg`]s. Each message goes through [`update`], the resulting commands
//! are handed to the [`Executor`], and the frame is redrawn.

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::app::{init, update, Model, Msg};
use crate::orchestrator::Executor;
use crate::tui::Tui;
use crate::ui;

/// Map a terminal event to a message; `None` for events the loop ignores.
pub fn translate(event: Event) -> Option<Msg> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(Msg::Key(key)),
        Event::Resize(..) => Some(Msg::Resize),
        _ => None,
    }
}

/// Run until the model stops.
pub async fn run(
    tui: &mut Tui,
    mut model: Model,
    executor: Executor,
    mut results: UnboundedReceiver<Msg>,
) -> Result<()> {
    let mut terminal_events = EventStream::new();

    for command in init(&mut model) {
        executor.dispatch(command);
    }
    tui.draw(|frame| ui::render(frame, &model))?;
    info!("Event loop started");

    while model.running {
        let msg = tokio::select! {
            event = terminal_events.next() => match event {
                Some(Ok(event)) => match translate(event) {
                    Some(msg) => msg,
                    None => continue,
                },
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(msg) = results.recv() => msg,
        };

        for command in update(&mut model, msg) {
            debug!("Dispatching {:?}", command);
            executor.dispatch(command);
        }
        tui.draw(|frame| ui::render(frame, &model))?;
    }

    executor.shutdown();
    info!("Event loop ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

    use super::*;

    #[test]
    fn test_only_key_presses_become_messages() {
        let press = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(matches!(translate(Event::Key(press)), Some(Msg::Key(_))));

        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press
        };
        assert!(translate(Event::Key(release)).is_none());
        assert!(matches!(translate(Event::Resize(80, 24)), Some(Msg::Resize)));
        assert!(translate(Event::FocusGained).is_none());
    }
}
