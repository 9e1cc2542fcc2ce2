// Zonekeeper - Mutation Orchestrator
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Mutation orchestration: backup guard, undo/redo and transactions.
//!
//! Mutations are plain values. The orchestrator wraps them into commands,
//! decides which need a backup first, and turns completed steps into undo
//! log entries according to the [`Disposition`] each command carried.

mod command;
mod exec;
pub mod transaction;
mod undo;

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

pub use command::{Action, Command, Ticket, Timer};
pub use exec::Executor;
pub use undo::{UndoAction, UndoLog};

use crate::error::{Error, Result};
use crate::firewall::Backend;
use crate::models::{validate_zone_name, Port, Source, View};

/// Direction of a simple mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Remove,
}

impl Op {
    pub fn inverse(self) -> Self {
        match self {
            Op::Add => Op::Remove,
            Op::Remove => Op::Add,
        }
    }
}

/// The zone element a mutation touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Change {
    Service(String),
    Port(Port),
    RichRule(String),
    Interface(String),
    Source(Source),
    /// `Add` enables masquerading, `Remove` disables it.
    Masquerade,
}

impl Change {
    pub fn kind(&self) -> &'static str {
        match self {
            Change::Service(_) => "service",
            Change::Port(_) => "port",
            Change::RichRule(_) => "rich rule",
            Change::Interface(_) => "interface",
            Change::Source(_) => "source",
            Change::Masquerade => "masquerade",
        }
    }

    /// The value as shown to the user.
    pub fn value(&self) -> String {
        match self {
            Change::Service(s) | Change::RichRule(s) | Change::Interface(s) => s.clone(),
            Change::Port(p) => p.key(),
            Change::Source(s) => s.to_string(),
            Change::Masquerade => String::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        let single_word = |what: &str, s: &str| {
            if s.trim().is_empty() {
                Err(Error::invalid(format!("{what} must not be empty")))
            } else if s.contains(char::is_whitespace) {
                Err(Error::invalid(format!("{what} '{s}' must not contain spaces")))
            } else {
                Ok(())
            }
        };
        match self {
            Change::Service(s) => single_word("Service name", s),
            Change::Interface(s) => single_word("Interface name", s),
            Change::RichRule(r) if r.trim().is_empty() => Err(Error::invalid("Rich rule must not be empty")),
            Change::RichRule(_) | Change::Port(_) | Change::Source(_) | Change::Masquerade => Ok(()),
        }
    }
}

/// A single add or remove against one zone in one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub zone: String,
    pub view: View,
    pub op: Op,
    pub change: Change,
}

impl Mutation {
    pub fn inverse(&self) -> Self {
        Self {
            op: self.op.inverse(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_zone_name(&self.zone)?;
        self.change.validate()
    }

    pub fn describe(&self) -> String {
        match (&self.change, self.op) {
            (Change::Masquerade, Op::Add) => "enable masquerade".to_string(),
            (Change::Masquerade, Op::Remove) => "disable masquerade".to_string(),
            (change, Op::Add) => format!("add {} {}", change.kind(), change.value()),
            (change, Op::Remove) => format!("remove {} {}", change.kind(), change.value()),
        }
    }

    /// Issue the matching gateway call.
    pub fn apply(&self, backend: &dyn Backend) -> Result<()> {
        let (zone, view) = (self.zone.as_str(), self.view);
        match (&self.change, self.op) {
            (Change::Service(s), Op::Add) => backend.add_service(zone, view, s),
            (Change::Service(s), Op::Remove) => backend.remove_service(zone, view, s),
            (Change::Port(p), Op::Add) => backend.add_port(zone, view, p),
            (Change::Port(p), Op::Remove) => backend.remove_port(zone, view, p),
            (Change::RichRule(r), Op::Add) => backend.add_rich_rule(zone, view, r),
            (Change::RichRule(r), Op::Remove) => backend.remove_rich_rule(zone, view, r),
            (Change::Interface(i), Op::Add) => backend.add_interface(zone, view, i),
            (Change::Interface(i), Op::Remove) => backend.remove_interface(zone, view, i),
            (Change::Source(s), Op::Add) => backend.add_source(zone, view, s),
            (Change::Source(s), Op::Remove) => backend.remove_source(zone, view, s),
            (Change::Masquerade, op) => backend.set_masquerade(zone, view, op == Op::Add),
        }
    }
}

/// Replace one value of a zone with another of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub zone: String,
    pub view: View,
    pub old: Change,
    pub new: Change,
}

impl Edit {
    pub fn inverse(&self) -> Self {
        Self {
            zone: self.zone.clone(),
            view: self.view,
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_zone_name(&self.zone)?;
        if std::mem::discriminant(&self.old) != std::mem::discriminant(&self.new)
            || self.old == Change::Masquerade
        {
            return Err(Error::invalid(format!(
                "Cannot replace a {} with a {}",
                self.old.kind(),
                self.new.kind()
            )));
        }
        if self.old == self.new {
            return Err(Error::invalid("New value is identical to the old one"));
        }
        self.new.validate()
    }

    pub fn removal(&self) -> Mutation {
        Mutation {
            zone: self.zone.clone(),
            view: self.view,
            op: Op::Remove,
            change: self.old.clone(),
        }
    }

    pub fn addition(&self) -> Mutation {
        Mutation {
            zone: self.zone.clone(),
            view: self.view,
            op: Op::Add,
            change: self.new.clone(),
        }
    }

    pub fn describe(&self) -> String {
        format!("change {} {} to {}", self.old.kind(), self.old.value(), self.new.value())
    }
}

/// A reversible unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Apply(Mutation),
    Edit(Edit),
}

impl Step {
    pub fn zone(&self) -> &str {
        match self {
            Step::Apply(m) => &m.zone,
            Step::Edit(e) => &e.zone,
        }
    }

    pub fn view(&self) -> View {
        match self {
            Step::Apply(m) => m.view,
            Step::Edit(e) => e.view,
        }
    }

    pub fn inverse(&self) -> Self {
        match self {
            Step::Apply(m) => Step::Apply(m.inverse()),
            Step::Edit(e) => Step::Edit(e.inverse()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Step::Apply(m) => m.describe(),
            Step::Edit(e) => e.describe(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Step::Apply(m) => m.validate(),
            Step::Edit(e) => e.validate(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} ({})", self.describe(), self.zone(), self.view())
    }
}

/// What the loop records once an applied step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A new user change: push to undo, clear redo.
    Fresh,
    /// A redo replay: push to undo, keep redo.
    RecordUndo,
    /// An undo replay: push to redo.
    RecordRedo,
    /// Record nothing.
    RecordNone,
}

/// Per-zone progress of the session backup.
#[derive(Debug)]
enum BackupState {
    /// Issued; commands guarded meanwhile wait here in submission order.
    Pending(Vec<Command>),
    Done,
}

/// Session state of the mutation protocol.
#[derive(Debug)]
pub struct Orchestrator {
    backups: HashMap<String, BackupState>,
    log: UndoLog,
}

impl Orchestrator {
    pub fn new(undo_capacity: usize) -> Self {
        Self {
            backups: HashMap::new(),
            log: UndoLog::new(undo_capacity),
        }
    }

    pub fn log(&self) -> &UndoLog {
        &self.log
    }

    pub fn is_backed_up(&self, zone: &str) -> bool {
        matches!(self.backups.get(zone), Some(BackupState::Done))
    }

    pub fn is_backup_pending(&self, zone: &str) -> bool {
        matches!(self.backups.get(zone), Some(BackupState::Pending(_)))
    }

    /// Put a backup of `zone` in front of `command` if this session has none yet.
    ///
    /// Returns `None` when a backup of the zone is still running; the command
    /// is queued and handed back by [`Orchestrator::backup_done`] or
    /// [`Orchestrator::backup_failed`].
    pub fn guard(&mut self, zone: &str, command: Command) -> Option<Command> {
        match self.backups.get_mut(zone) {
            Some(BackupState::Done) => Some(command),
            Some(BackupState::Pending(queue)) => {
                debug!("Backup of {} still running, queueing {:?}", zone, command);
                queue.push(command);
                None
            }
            None => {
                debug!("First change to zone {} this session, backing up first", zone);
                self.backups
                    .insert(zone.to_string(), BackupState::Pending(Vec::new()));
                Some(Command::CreateBackup {
                    zone: zone.to_string(),
                    description: None,
                    then: Some(Box::new(command)),
                })
            }
        }
    }

    /// The session backup of `zone` finished or was skipped. Returns the
    /// commands queued behind it, oldest first.
    pub fn backup_done(&mut self, zone: &str) -> Vec<Command> {
        match self.backups.insert(zone.to_string(), BackupState::Done) {
            Some(BackupState::Pending(queue)) => queue,
            _ => Vec::new(),
        }
    }

    /// The session backup of `zone` failed. The zone is forgotten so the next
    /// change retries, and the commands queued behind it are returned
    /// unexecuted.
    pub fn backup_failed(&mut self, zone: &str) -> Vec<Command> {
        match self.backups.remove(zone) {
            Some(BackupState::Pending(queue)) => queue,
            _ => Vec::new(),
        }
    }

    /// Drop a command that will never run. A replay goes back to its stack.
    pub fn abandon(&mut self, command: Command) {
        if let Command::Apply { step, disposition } = command {
            self.settle(&step, disposition, false);
        }
    }

    /// Wrap a new user change. `None` means it waits behind a running backup.
    pub fn submit(&mut self, step: Step) -> Result<Option<Command>> {
        step.validate()?;
        let zone = step.zone().to_string();
        Ok(self.guard(
            &zone,
            Command::Apply {
                step,
                disposition: Disposition::Fresh,
            },
        ))
    }

    /// Replay the newest undo entry, if any.
    pub fn undo(&mut self) -> Option<(String, Option<Command>)> {
        let action = self.log.pop_undo()?;
        let command = Command::Apply {
            step: action.undo,
            disposition: Disposition::RecordRedo,
        };
        Some((action.label, self.guard(&action.zone, command)))
    }

    /// Replay the newest redo entry, if any.
    pub fn redo(&mut self) -> Option<(String, Option<Command>)> {
        let action = self.log.pop_redo()?;
        let command = Command::Apply {
            step: action.redo,
            disposition: Disposition::RecordUndo,
        };
        Some((action.label, self.guard(&action.zone, command)))
    }

    /// Record the outcome of an applied step.
    ///
    /// A failed replay goes back on the stack it was taken from.
    pub fn settle(&mut self, step: &Step, disposition: Disposition, succeeded: bool) {
        match (disposition, succeeded) {
            (Disposition::Fresh, true) => {
                self.log.push_undo(UndoAction::for_applied(step));
                self.log.clear_redo();
            }
            (Disposition::RecordUndo, true) => self.log.push_undo(UndoAction::for_applied(step)),
            (Disposition::RecordUndo, false) => self.log.push_redo(UndoAction::for_applied(step)),
            // An undo replay applied the inverse; the original is what redo repeats.
            (Disposition::RecordRedo, true) => {
                self.log.push_redo(UndoAction::for_applied(&step.inverse()))
            }
            (Disposition::RecordRedo, false) => {
                self.log.push_undo(UndoAction::for_applied(&step.inverse()))
            }
            (Disposition::Fresh, false) | (Disposition::RecordNone, _) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn add_service(zone: &str, name: &str) -> Step {
        Step::Apply(Mutation {
            zone: zone.into(),
            view: View::Runtime,
            op: Op::Add,
            change: Change::Service(name.into()),
        })
    }

    fn applied(command: &Command) -> (&Step, Disposition) {
        match command {
            Command::Apply { step, disposition } => (step, *disposition),
            other => panic!("expected Apply, got {other:?}"),
        }
    }

    #[test]
    fn test_first_change_is_backed_up_once() {
        let mut orch = Orchestrator::new(10);

        let first = orch.submit(add_service("public", "ssh")).unwrap().unwrap();
        match &first {
            Command::CreateBackup { zone, description, then } => {
                assert_eq!(zone, "public");
                assert!(description.is_none());
                let (step, disposition) = applied(then.as_deref().unwrap());
                assert_eq!(step, &add_service("public", "ssh"));
                assert_eq!(disposition, Disposition::Fresh);
            }
            other => panic!("expected a backup first, got {other:?}"),
        }

        assert!(orch.backup_done("public").is_empty());
        assert!(orch.is_backed_up("public"));

        let second = orch.submit(add_service("public", "http")).unwrap().unwrap();
        assert_eq!(applied(&second).0, &add_service("public", "http"));

        // Another zone gets its own backup.
        assert!(matches!(
            orch.submit(add_service("home", "ssh")).unwrap(),
            Some(Command::CreateBackup { .. })
        ));
    }

    #[test]
    fn test_changes_wait_for_running_backup() {
        let mut orch = Orchestrator::new(10);
        orch.submit(add_service("public", "ssh")).unwrap();
        assert!(orch.is_backup_pending("public"));

        assert!(orch.submit(add_service("public", "http")).unwrap().is_none());
        assert!(orch.submit(add_service("public", "https")).unwrap().is_none());
        assert!(!orch.is_backed_up("public"));

        let released = orch.backup_done("public");
        let steps: Vec<&Step> = released.iter().map(|c| applied(c).0).collect();
        assert_eq!(
            steps,
            vec![&add_service("public", "http"), &add_service("public", "https")]
        );
        assert!(orch.is_backed_up("public"));
        assert!(!orch.is_backup_pending("public"));
    }

    #[test]
    fn test_failed_backup_is_retried() {
        let mut orch = Orchestrator::new(10);
        orch.submit(add_service("public", "ssh")).unwrap();
        orch.submit(add_service("public", "http")).unwrap();

        let dropped = orch.backup_failed("public");
        assert_eq!(dropped.len(), 1);
        assert_eq!(applied(&dropped[0]).0, &add_service("public", "http"));
        assert!(matches!(
            orch.submit(add_service("public", "ssh")).unwrap(),
            Some(Command::CreateBackup { .. })
        ));
    }

    #[test]
    fn test_abandoned_replay_returns_to_its_stack() {
        let mut orch = Orchestrator::new(10);
        let step = add_service("public", "ssh");
        orch.settle(&step, Disposition::Fresh, true);
        let (_, command) = orch.undo().unwrap();
        assert_eq!(orch.log().undo_len(), 0);

        let Some(Command::CreateBackup { then: Some(then), .. }) = command else {
            panic!("expected a guarded undo");
        };
        orch.abandon(*then);
        assert_eq!(orch.log().undo_len(), 1);
        assert_eq!(orch.log().peek_undo().unwrap().redo, step);
    }

    #[test]
    fn test_invalid_input_rejected_before_any_command() {
        let mut orch = Orchestrator::new(10);
        assert!(orch.submit(add_service("public", "two words")).is_err());
        assert!(orch.submit(add_service("../etc", "ssh")).is_err());
        assert!(!orch.is_backed_up("public"));
    }

    #[test]
    fn test_undo_redo_dispositions() {
        let mut orch = Orchestrator::new(10);
        let step = add_service("public", "ssh");
        orch.submit(step.clone()).unwrap();
        orch.backup_done("public");
        orch.settle(&step, Disposition::Fresh, true);
        assert_eq!(orch.log().undo_len(), 1);

        let (label, command) = orch.undo().unwrap();
        assert_eq!(label, "add service ssh");
        let command = command.unwrap();
        let (undo_step, disposition) = applied(&command);
        assert_eq!(undo_step, &step.inverse());
        assert_eq!(disposition, Disposition::RecordRedo);
        let undo_step = undo_step.clone();
        orch.settle(&undo_step, disposition, true);
        assert_eq!((orch.log().undo_len(), orch.log().redo_len()), (0, 1));

        let command = orch.redo().unwrap().1.unwrap();
        let (redo_step, disposition) = applied(&command);
        assert_eq!(redo_step, &step);
        assert_eq!(disposition, Disposition::RecordUndo);
        orch.settle(&step, disposition, true);
        assert_eq!((orch.log().undo_len(), orch.log().redo_len()), (1, 0));
        assert_eq!(orch.log().peek_undo().unwrap().redo, step);
    }

    #[test]
    fn test_replays_do_not_clear_opposite_stack() {
        let mut orch = Orchestrator::new(10);
        orch.backups.insert("public".into(), BackupState::Done);
        let a = add_service("public", "a");
        let b = add_service("public", "b");
        orch.settle(&a, Disposition::Fresh, true);
        orch.settle(&b, Disposition::Fresh, true);

        let undo_b = orch.undo().unwrap().1.unwrap();
        let (step, d) = applied(&undo_b);
        let step = step.clone();
        orch.settle(&step, d, true);
        assert_eq!((orch.log().undo_len(), orch.log().redo_len()), (1, 1));

        // Redo of b pushes to undo and keeps any other redo entries.
        orch.settle(&add_service("public", "x").inverse(), Disposition::RecordRedo, true);
        assert_eq!(orch.log().redo_len(), 2);
        orch.settle(&b, Disposition::RecordUndo, true);
        assert_eq!((orch.log().undo_len(), orch.log().redo_len()), (2, 2));

        // A fresh change clears redo.
        orch.settle(&add_service("public", "c"), Disposition::Fresh, true);
        assert_eq!(orch.log().redo_len(), 0);
    }

    #[test]
    fn test_failed_replay_returns_to_origin() {
        let mut orch = Orchestrator::new(10);
        orch.backups.insert("public".into(), BackupState::Done);
        let step = add_service("public", "ssh");
        orch.settle(&step, Disposition::Fresh, true);

        let command = orch.undo().unwrap().1.unwrap();
        let (undo_step, d) = applied(&command);
        let undo_step = undo_step.clone();
        orch.settle(&undo_step, d, false);
        assert_eq!((orch.log().undo_len(), orch.log().redo_len()), (1, 0));
        assert_eq!(orch.log().peek_undo().unwrap().redo, step);

        let action = orch.log().peek_undo().unwrap().clone();
        orch.settle(&step, Disposition::Fresh, false);
        orch.settle(&step, Disposition::RecordNone, true);
        assert_eq!(orch.log().undo_len(), 1);
        assert_eq!(orch.log().peek_undo(), Some(&action));
    }

    #[test]
    fn test_edit_validation() {
        let edit = Edit {
            zone: "public".into(),
            view: View::Permanent,
            old: Change::RichRule("rule a".into()),
            new: Change::Service("ssh".into()),
        };
        assert!(edit.validate().is_err());

        let edit = Edit {
            new: Change::RichRule("rule b".into()),
            ..edit
        };
        assert!(edit.validate().is_ok());
        assert_eq!(edit.inverse().inverse(), edit);
        assert_eq!(edit.removal().change, Change::RichRule("rule a".into()));
        assert_eq!(edit.addition().op, Op::Add);
    }

    #[test]
    fn test_describe() {
        let step = Step::Apply(Mutation {
            zone: "dmz".into(),
            view: View::Permanent,
            op: Op::Remove,
            change: Change::Port(Port::parse("8080/tcp").unwrap()),
        });
        assert_eq!(step.to_string(), "remove port 8080/tcp in dmz (permanent)");
    }
}
