// Zonekeeper - Change Notifications
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Subscription to firewalld signals.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};
use zbus::message::Type as MessageType;
use zbus::zvariant::{Structure, Value};
use zbus::{MatchRule, Message, MessageStream};

use super::{interfaces, BUS_NAME};
use crate::error::Result;

/// One change notification from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallSignal {
    pub interface: String,
    pub name: String,
    /// The zone the change concerns, when the signal names one.
    pub zone: Option<String>,
}

impl FirewallSignal {
    /// Whether the whole configuration may have changed.
    pub fn is_global(&self) -> bool {
        matches!(
            self.name.as_str(),
            "Reloaded" | "PanicModeEnabled" | "PanicModeDisabled" | "DefaultZoneChanged"
        )
    }
}

/// A source of change notifications, delivered one at a time.
pub trait EventSource: Send + Sync {
    /// Wait for the next signal. Resolves to `None` once cancelled or closed.
    fn next_event(&self) -> BoxFuture<'_, Option<FirewallSignal>>;

    /// Stop delivery and release the subscription. Safe to call repeatedly.
    fn cancel(&self);
}

/// Build a signal from its header fields and first string argument.
///
/// Returns `None` for messages outside firewalld's interfaces.
pub fn signal_from_parts(interface: &str, member: &str, first_arg: Option<&str>) -> Option<FirewallSignal> {
    if !interface.starts_with(BUS_NAME) {
        return None;
    }

    let names_zone = interface == interfaces::ZONE
        || interface == interfaces::CONFIG_ZONE
        || matches!(member, "DefaultZoneChanged" | "ZoneAdded" | "ZoneRemoved" | "ZoneRenamed");

    Some(FirewallSignal {
        interface: interface.to_string(),
        name: member.to_string(),
        zone: first_arg
            .filter(|_| names_zone)
            .filter(|z| !z.is_empty())
            .map(str::to_string),
    })
}

fn first_string_arg(msg: &Message) -> Option<String> {
    let body = msg.body();
    let fields: Structure = body.deserialize().ok()?;
    match fields.fields().first()? {
        Value::Str(s) => Some(s.as_str().to_string()),
        _ => None,
    }
}

fn signal_from_message(msg: &Message) -> Option<FirewallSignal> {
    let header = msg.header();
    let interface = header.interface()?.to_string();
    let member = header.member()?.to_string();
    signal_from_parts(&interface, &member, first_string_arg(msg).as_deref())
}

/// A live match rule on the bus for every firewalld signal.
pub struct Subscription {
    stream: Mutex<Option<MessageStream>>,
    cancelled: AtomicBool,
    wake: Notify,
}

impl Subscription {
    /// Open a dedicated bus connection and register the match rule on it.
    pub async fn open() -> Result<Self> {
        let conn = zbus::Connection::system().await?;
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .sender(BUS_NAME)?
            .build();
        let stream = MessageStream::for_match_rule(rule, &conn, Some(64)).await?;
        info!("Subscribed to firewalld signals");
        Ok(Self {
            stream: Mutex::new(Some(stream)),
            cancelled: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl EventSource for Subscription {
    fn next_event(&self) -> BoxFuture<'_, Option<FirewallSignal>> {
        Box::pin(async move {
            if self.is_cancelled() {
                return None;
            }
            let mut guard = self.stream.lock().await;
            loop {
                let stream = guard.as_mut()?;
                tokio::select! {
                    _ = self.wake.notified() => {
                        *guard = None;
                        return None;
                    }
                    msg = stream.next() => match msg {
                        Some(Ok(msg)) => {
                            if let Some(signal) = signal_from_message(&msg) {
                                debug!("Signal {}.{}", signal.interface, signal.name);
                                return Some(signal);
                            }
                        }
                        Some(Err(e)) => warn!("Dropping malformed signal: {}", e),
                        None => {
                            *guard = None;
                            return None;
                        }
                    }
                }
            }
        })
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wakes a listener blocked in next_event, or is remembered for the next one.
        self.wake.notify_one();
        if let Ok(mut guard) = self.stream.try_lock() {
            guard.take();
        }
        info!("Signal subscription cancelled");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
pub mod scripted {
    //! A scripted event source for executor tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::{EventSource, FirewallSignal};

    #[derive(Default)]
    pub struct ScriptedEvents {
        queue: Mutex<VecDeque<FirewallSignal>>,
        pub cancels: AtomicUsize,
    }

    impl ScriptedEvents {
        pub fn new(signals: Vec<FirewallSignal>) -> Self {
            Self {
                queue: Mutex::new(signals.into()),
                cancels: AtomicUsize::new(0),
            }
        }
    }

    impl EventSource for ScriptedEvents {
        fn next_event(&self) -> BoxFuture<'_, Option<FirewallSignal>> {
            let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
            Box::pin(async move { next })
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut q) = self.queue.lock() {
                q.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_signals_carry_zone() {
        let sig = signal_from_parts(interfaces::ZONE, "ServiceAdded", Some("public")).unwrap();
        assert_eq!(sig.zone.as_deref(), Some("public"));
        assert!(!sig.is_global());

        let sig = signal_from_parts(interfaces::MAIN, "DefaultZoneChanged", Some("home")).unwrap();
        assert_eq!(sig.zone.as_deref(), Some("home"));
        assert!(sig.is_global());
    }

    #[test]
    fn test_ipset_signals_do_not_name_zone() {
        let sig = signal_from_parts(interfaces::IPSET, "EntryAdded", Some("blocklist")).unwrap();
        assert_eq!(sig.zone, None);
    }

    #[test]
    fn test_foreign_interfaces_ignored() {
        assert!(signal_from_parts("org.freedesktop.DBus", "NameOwnerChanged", Some("x")).is_none());
    }

    #[test]
    fn test_reload_without_args() {
        let sig = signal_from_parts(interfaces::MAIN, "Reloaded", None).unwrap();
        assert!(sig.is_global());
        assert_eq!(sig.zone, None);
    }
}
