// Zonekeeper - Command Executor
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Runs commands off the dispatch loop and posts one message per command.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::{transaction, Action, Command, Op};
use crate::app::{Msg, ZoneList};
use crate::backup::BackupStore;
use crate::error::{Error, Result};
use crate::firewall::{Backend, EventSource, ServiceCatalog};
use crate::models::validate_zone_name;

/// Owns everything commands need. Cheap to clone into tasks.
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn Backend>,
    backups: BackupStore,
    catalog: ServiceCatalog,
    events: Option<Arc<dyn EventSource>>,
    tx: UnboundedSender<Msg>,
}

impl Executor {
    pub fn new(
        backend: Arc<dyn Backend>,
        backups: BackupStore,
        catalog: ServiceCatalog,
        events: Option<Arc<dyn EventSource>>,
        tx: UnboundedSender<Msg>,
    ) -> Self {
        Self {
            backend,
            backups,
            catalog,
            events,
            tx,
        }
    }

    /// Start `command` on the runtime. Must be called from within tokio.
    pub fn dispatch(&self, command: Command) {
        match command {
            Command::Quit => {}
            Command::Listen => {
                let events = self.events.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let signal = match events {
                        Some(events) => events.next_event().await,
                        None => None,
                    };
                    let _ = tx.send(Msg::Notified(signal));
                });
            }
            Command::Schedule { after, timer } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Msg::Timer(timer));
                });
            }
            command => {
                let this = self.clone();
                tokio::task::spawn_blocking(move || {
                    if let Some(msg) = this.run(command) {
                        if this.tx.send(msg).is_err() {
                            debug!("Dispatch loop gone, dropping result");
                        }
                    }
                });
            }
        }
    }

    /// Stop the notification subscription. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let Some(events) = &self.events {
            events.cancel();
        }
    }

    /// Run a blocking command to completion.
    ///
    /// Returns `None` for commands that are not blocking work
    /// (`Listen`, `Schedule`, `Quit`).
    pub fn run(&self, command: Command) -> Option<Msg> {
        let backend = self.backend.as_ref();
        let msg = match command {
            Command::LoadZones { view } => Msg::ZonesLoaded {
                view,
                result: load_zones(backend, view),
            },
            Command::FetchZone { ticket } => {
                let result = backend.zone_settings(&ticket.zone, ticket.view);
                Msg::ZoneFetched { ticket, result }
            }
            Command::LoadIpSets => Msg::IpSetsLoaded(backend.list_ipsets()),
            Command::FetchIpSet { name } => {
                let result = backend.ipset_entries(&name);
                Msg::IpSetFetched { name, result }
            }
            Command::LoadService { name } => {
                let result = self.catalog.lookup(&name);
                Msg::ServiceLoaded { name, result }
            }
            Command::QueryPanic => Msg::PanicState(backend.query_panic_mode()),
            Command::ListBackups { zone } => {
                let result = self.backups.list(&zone);
                Msg::BackupsListed { zone, result }
            }
            Command::CreateBackup {
                zone,
                description,
                then,
            } => {
                let result = self.backups.create(&zone, description.as_deref());
                if let Err(e) = &result {
                    if e.is_missing_backup_source() {
                        debug!("No persisted file for zone {}, backup skipped", zone);
                    } else {
                        warn!("Backup of zone {} failed: {}", zone, e);
                    }
                }
                Msg::BackupCreated { zone, result, then }
            }
            Command::Apply { step, disposition } => {
                let outcome = transaction::apply_step(backend, &step);
                Msg::Applied {
                    step,
                    disposition,
                    touched: outcome.touched,
                    result: outcome.result,
                }
            }
            Command::ApplyTemplate {
                zone,
                view,
                template,
                services,
                ports,
            } => {
                let outcome = transaction::apply_template(backend, &zone, view, &services, &ports);
                Msg::TemplateApplied {
                    zone,
                    view,
                    template,
                    applied: outcome.applied,
                    result: outcome.result,
                }
            }
            Command::Perform(action) => {
                let result = perform(backend, &action);
                Msg::Done { action, result }
            }
            Command::RestoreBackup { zone, backup } => {
                let result = self.backups.restore(&zone, &backup);
                Msg::Restored { zone, result }
            }
            Command::RevertRestore { zone } => {
                let result = self.backups.revert_restore(&zone);
                Msg::RestoreReverted { zone, result }
            }
            Command::Listen | Command::Schedule { .. } | Command::Quit => return None,
        };
        Some(msg)
    }
}

fn load_zones(backend: &dyn Backend, view: crate::models::View) -> Result<ZoneList> {
    let mut names = backend.list_zones(view)?;
    names.sort();
    Ok(ZoneList {
        names,
        default_zone: backend.default_zone()?,
        active: backend.active_zones()?,
        version: backend.version(),
    })
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(format!("{what} must not be empty")));
    }
    Ok(())
}

fn perform(backend: &dyn Backend, action: &Action) -> Result<()> {
    match action {
        Action::SetDefaultZone(zone) => {
            validate_zone_name(zone)?;
            backend.set_default_zone(zone)
        }
        Action::AddZone(zone) => {
            validate_zone_name(zone)?;
            backend.add_zone(zone)
        }
        Action::RemoveZone(zone) => {
            validate_zone_name(zone)?;
            backend.remove_zone(zone)
        }
        Action::Commit => backend.commit(),
        Action::Reload => backend.reload(),
        Action::SetPanic(enabled) => backend.set_panic_mode(*enabled),
        Action::IpSetEntry { ipset, entry, op } => {
            require("Entry", entry)?;
            match op {
                Op::Add => backend.add_ipset_entry(ipset, entry.trim()),
                Op::Remove => backend.remove_ipset_entry(ipset, entry.trim()),
            }
        }
        Action::AddIpSet { name, kind } => {
            validate_zone_name(name)?;
            require("Set type", kind)?;
            backend.add_ipset(name, kind.trim())
        }
        Action::RemoveIpSet(name) => {
            validate_zone_name(name)?;
            backend.remove_ipset(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::*;
    use crate::firewall::fake::FakeBackend;
    use crate::firewall::scripted::ScriptedEvents;
    use crate::firewall::FirewallSignal;
    use crate::models::View;
    use crate::orchestrator::{Change, Disposition, Mutation, Step, Ticket, Timer};

    struct Fixture {
        fake: Arc<FakeBackend>,
        exec: Executor,
        rx: mpsc::UnboundedReceiver<Msg>,
        dir: tempfile::TempDir,
    }

    fn fixture(events: Option<Arc<dyn EventSource>>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let zones = dir.path().join("zones");
        fs::create_dir_all(&zones).unwrap();
        let fake = Arc::new(FakeBackend::with_zones(&["public", "home"]));
        let (tx, rx) = mpsc::unbounded_channel();
        let exec = Executor::new(
            fake.clone(),
            BackupStore::new(dir.path().join("backups"), zones, 5),
            ServiceCatalog::new(vec![dir.path().join("services")]),
            events,
            tx,
        );
        Fixture { fake, exec, rx, dir }
    }

    #[test]
    fn test_load_zones_combines_calls() {
        let f = fixture(None);
        match f.exec.run(Command::LoadZones { view: View::Runtime }) {
            Some(Msg::ZonesLoaded { view, result }) => {
                assert_eq!(view, View::Runtime);
                let list = result.unwrap();
                assert_eq!(list.names, vec!["home", "public"]);
                assert_eq!(list.default_zone, "public");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fetch_carries_ticket() {
        let f = fixture(None);
        let ticket = Ticket {
            zone: "home".into(),
            view: View::Permanent,
            seq: 7,
        };
        match f.exec.run(Command::FetchZone { ticket: ticket.clone() }) {
            Some(Msg::ZoneFetched { ticket: t, result }) => {
                assert_eq!(t, ticket);
                assert_eq!(result.unwrap().name, "home");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_apply_reports_touched() {
        let f = fixture(None);
        let step = Step::Apply(Mutation {
            zone: "public".into(),
            view: View::Runtime,
            op: Op::Add,
            change: Change::Service("ssh".into()),
        });
        match f.exec.run(Command::Apply {
            step: step.clone(),
            disposition: Disposition::Fresh,
        }) {
            Some(Msg::Applied {
                step: s,
                disposition,
                touched,
                result,
            }) => {
                assert_eq!(s, step);
                assert_eq!(disposition, Disposition::Fresh);
                assert!(touched);
                assert!(result.is_ok());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.fake.calls(), vec!["add_service public runtime ssh"]);
    }

    #[test]
    fn test_backup_keeps_deferred_command() {
        let f = fixture(None);
        let then = Command::Perform(Action::Reload);
        match f.exec.run(Command::CreateBackup {
            zone: "public".into(),
            description: None,
            then: Some(Box::new(then.clone())),
        }) {
            Some(Msg::BackupCreated { zone, result, then: t }) => {
                assert_eq!(zone, "public");
                assert!(result.unwrap_err().is_missing_backup_source());
                assert_eq!(t.as_deref(), Some(&then));
            }
            other => panic!("unexpected {other:?}"),
        }

        fs::write(f.dir.path().join("zones/public.xml"), "<zone/>").unwrap();
        match f.exec.run(Command::CreateBackup {
            zone: "public".into(),
            description: Some("manual".into()),
            then: None,
        }) {
            Some(Msg::BackupCreated { result, then, .. }) => {
                assert_eq!(result.unwrap().description.as_deref(), Some("manual"));
                assert!(then.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_perform_validates_before_calling() {
        let f = fixture(None);
        match f.exec.run(Command::Perform(Action::AddZone("../evil".into()))) {
            Some(Msg::Done { result, .. }) => assert!(matches!(result, Err(Error::Validation(_)))),
            other => panic!("unexpected {other:?}"),
        }
        match f.exec.run(Command::Perform(Action::IpSetEntry {
            ipset: "blocklist".into(),
            entry: "  ".into(),
            op: Op::Add,
        })) {
            Some(Msg::Done { result, .. }) => assert!(result.is_err()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(f.fake.calls().is_empty());
    }

    #[test]
    fn test_ipset_entry_is_trimmed_and_visible_on_fetch() {
        let f = fixture(None);
        f.fake.insert_ipset("blocklist", &["10.0.0.1"]);
        match f.exec.run(Command::Perform(Action::IpSetEntry {
            ipset: "blocklist".into(),
            entry: " 10.0.0.2 ".into(),
            op: Op::Add,
        })) {
            Some(Msg::Done { result, .. }) => assert!(result.is_ok()),
            other => panic!("unexpected {other:?}"),
        }
        match f.exec.run(Command::FetchIpSet { name: "blocklist".into() }) {
            Some(Msg::IpSetFetched { name, result }) => {
                assert_eq!(name, "blocklist");
                assert_eq!(result.unwrap().entries, vec!["10.0.0.1", "10.0.0.2"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_loop_commands_are_not_run_inline() {
        let f = fixture(None);
        assert!(f.exec.run(Command::Listen).is_none());
        assert!(f.exec.run(Command::Quit).is_none());
    }

    #[tokio::test]
    async fn test_dispatch_posts_one_message() {
        let mut f = fixture(None);
        f.exec.dispatch(Command::QueryPanic);
        match f.rx.recv().await {
            Some(Msg::PanicState(Ok(false))) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listen_delivers_then_ends() {
        let signal = FirewallSignal {
            interface: crate::firewall::interfaces::ZONE.into(),
            name: "ServiceAdded".into(),
            zone: Some("public".into()),
        };
        let events = Arc::new(ScriptedEvents::new(vec![signal.clone()]));
        let mut f = fixture(Some(events.clone()));

        f.exec.dispatch(Command::Listen);
        match f.rx.recv().await {
            Some(Msg::Notified(Some(s))) => assert_eq!(s, signal),
            other => panic!("unexpected {other:?}"),
        }
        f.exec.dispatch(Command::Listen);
        assert!(matches!(f.rx.recv().await, Some(Msg::Notified(None))));

        f.exec.shutdown();
        f.exec.shutdown();
        assert_eq!(events.cancels.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_schedule_fires_timer() {
        let mut f = fixture(None);
        let timer = Timer::Refresh { generation: 3 };
        f.exec.dispatch(Command::Schedule {
            after: Duration::from_millis(5),
            timer,
        });
        match f.rx.recv().await {
            Some(Msg::Timer(t)) => assert_eq!(t, timer),
            other => panic!("unexpected {other:?}"),
        }
    }
}
