// Zonekeeper - Transactions
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Multi-call mutations: edit-in-place with rollback, and template application.

use tracing::{error, info, warn};

use super::{Change, Edit, Mutation, Op, Step};
use crate::error::{Error, Result};
use crate::firewall::Backend;
use crate::models::{Port, View};

/// Result of running a step, and whether the backend was changed along the way.
#[derive(Debug)]
pub struct Outcome {
    /// At least one call reached the backend and succeeded.
    pub touched: bool,
    pub result: Result<()>,
}

impl Outcome {
    fn untouched(err: Error) -> Self {
        Self {
            touched: false,
            result: Err(err),
        }
    }
}

/// Run a step: a single call for a mutation, the transaction for an edit.
pub fn apply_step(backend: &dyn Backend, step: &Step) -> Outcome {
    if let Err(e) = step.validate() {
        return Outcome::untouched(e);
    }
    match step {
        Step::Apply(mutation) => match mutation.apply(backend) {
            Ok(()) => Outcome {
                touched: true,
                result: Ok(()),
            },
            Err(e) => Outcome::untouched(e),
        },
        Step::Edit(edit) => edit_in_place(backend, edit),
    }
}

/// Replace `edit.old` with `edit.new` as remove then add.
///
/// A failed removal changes nothing. A failed addition triggers exactly one
/// re-add of the old value; if that also fails the error is
/// [`Error::RollbackFailed`], naming the value that is now missing.
pub fn edit_in_place(backend: &dyn Backend, edit: &Edit) -> Outcome {
    let removal = edit.removal();
    if let Err(e) = removal.apply(backend) {
        return Outcome::untouched(e);
    }

    let err = match edit.addition().apply(backend) {
        Ok(()) => {
            info!("{} in zone {} ({})", edit.describe(), edit.zone, edit.view);
            return Outcome {
                touched: true,
                result: Ok(()),
            };
        }
        Err(e) => e,
    };

    warn!(
        "Adding {} {} to zone {} failed ({}), restoring {}",
        edit.new.kind(),
        edit.new.value(),
        edit.zone,
        err,
        edit.old.value()
    );

    let result = match removal.inverse().apply(backend) {
        Ok(()) => Err(err),
        Err(rollback) => {
            error!(
                "Rollback of {} {} in zone {} failed: {}",
                edit.old.kind(),
                edit.old.value(),
                edit.zone,
                rollback
            );
            Err(Error::RollbackFailed {
                original: Box::new(err),
                rollback: Box::new(rollback),
                value: edit.old.value(),
            })
        }
    };
    Outcome {
        touched: true,
        result,
    }
}

/// Progress of a template application.
#[derive(Debug)]
pub struct TemplateOutcome {
    /// Items added before the first failure (or all of them).
    pub applied: Vec<String>,
    pub result: Result<()>,
}

/// Add `services` then `ports` in order, stopping at the first failure.
///
/// Nothing is rolled back; callers leave out items the zone already has.
pub fn apply_template(
    backend: &dyn Backend,
    zone: &str,
    view: View,
    services: &[String],
    ports: &[Port],
) -> TemplateOutcome {
    let changes = services
        .iter()
        .cloned()
        .map(Change::Service)
        .chain(ports.iter().cloned().map(Change::Port));

    let mut applied = Vec::new();
    for change in changes {
        let mutation = Mutation {
            zone: zone.to_string(),
            view,
            op: Op::Add,
            change,
        };
        if let Err(e) = mutation.validate().and_then(|()| mutation.apply(backend)) {
            warn!("Template stopped at {}: {}", mutation.describe(), e);
            return TemplateOutcome {
                applied,
                result: Err(e),
            };
        }
        applied.push(mutation.change.value());
    }
    TemplateOutcome {
        applied,
        result: Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::firewall::fake::FakeBackend;
    use crate::models::Protocol;

    fn rule_edit(old: &str, new: &str) -> Edit {
        Edit {
            zone: "public".into(),
            view: View::Runtime,
            old: Change::RichRule(old.into()),
            new: Change::RichRule(new.into()),
        }
    }

    fn backend_with_rule(rule: &str) -> FakeBackend {
        let fake = FakeBackend::with_zones(&["public"]);
        fake.edit_zone("public", View::Runtime, |z| z.rich_rules.push(rule.into()));
        fake
    }

    #[test]
    fn test_edit_success() {
        let fake = backend_with_rule("old rule");
        let outcome = edit_in_place(&fake, &rule_edit("old rule", "new rule"));
        assert!(outcome.result.is_ok());
        assert!(outcome.touched);
        assert_eq!(fake.zone("public", View::Runtime).unwrap().rich_rules, vec!["new rule"]);
    }

    #[test]
    fn test_failed_add_rolls_back_once() {
        let fake = backend_with_rule("old rule");
        fake.fail_next("add_rich_rule", Error::PermissionDenied("denied".into()));

        let outcome = edit_in_place(&fake, &rule_edit("old rule", "new rule"));
        assert!(matches!(outcome.result, Err(Error::PermissionDenied(_))));
        assert!(outcome.touched);
        assert_eq!(fake.count("remove_rich_rule"), 1);
        // The failed add plus exactly one rollback add.
        assert_eq!(fake.count("add_rich_rule"), 2);
        assert_eq!(
            fake.calls().last().unwrap(),
            "add_rich_rule public runtime old rule"
        );
        assert_eq!(fake.zone("public", View::Runtime).unwrap().rich_rules, vec!["old rule"]);
    }

    #[test]
    fn test_failed_rollback_names_both_failures() {
        let fake = backend_with_rule("old rule");
        fake.fail_next("add_rich_rule", Error::Transport("INVALID_RULE: bad syntax".into()));
        fake.fail_next("add_rich_rule", Error::Transport("connection reset".into()));

        let outcome = edit_in_place(&fake, &rule_edit("old rule", "new rule"));
        assert_eq!(fake.count("add_rich_rule"), 2);
        let err = outcome.result.unwrap_err();
        assert!(matches!(err, Error::RollbackFailed { ref value, .. } if value == "old rule"));
        let message = err.to_string();
        assert!(message.contains("INVALID_RULE: bad syntax"), "{message}");
        assert!(message.contains("connection reset"), "{message}");
        assert!(message.contains("rollback also failed"), "{message}");
        assert!(message.contains("'old rule'"), "{message}");
        assert!(fake.zone("public", View::Runtime).unwrap().rich_rules.is_empty());
    }

    #[test]
    fn test_failed_remove_never_rolls_back() {
        let fake = backend_with_rule("old rule");
        fake.fail_next("remove_rich_rule", Error::InvalidZone { zone: "public".into() });

        let outcome = edit_in_place(&fake, &rule_edit("old rule", "new rule"));
        assert!(matches!(outcome.result, Err(Error::InvalidZone { .. })));
        assert!(!outcome.touched);
        assert_eq!(fake.count("add_rich_rule"), 0);
    }

    #[test]
    fn test_apply_step_validates_first() {
        let fake = FakeBackend::with_zones(&["public"]);
        let step = Step::Apply(Mutation {
            zone: "a/b".into(),
            view: View::Runtime,
            op: Op::Add,
            change: Change::Service("ssh".into()),
        });
        let outcome = apply_step(&fake, &step);
        assert!(matches!(outcome.result, Err(Error::Validation(_))));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_template_order_and_stop() {
        let fake = FakeBackend::with_zones(&["public"]);
        fake.fail_next("add_port", Error::PermissionDenied("denied".into()));
        let services = vec!["http".to_string(), "https".to_string()];
        let ports = vec![Port::new("8080", Protocol::Tcp), Port::new("8443", Protocol::Tcp)];

        let outcome = apply_template(&fake, "public", View::Permanent, &services, &ports);
        assert_eq!(outcome.applied, vec!["http", "https"]);
        assert!(matches!(outcome.result, Err(Error::PermissionDenied(_))));
        assert_eq!(
            fake.calls(),
            vec![
                "add_service public permanent http",
                "add_service public permanent https",
                "add_port public permanent 8080/tcp",
            ]
        );
        // Partial application stays.
        assert_eq!(
            fake.zone("public", View::Permanent).unwrap().services,
            vec!["http", "https"]
        );
    }

    #[test]
    fn test_template_full_application() {
        let fake = FakeBackend::with_zones(&["home"]);
        let outcome = apply_template(
            &fake,
            "home",
            View::Runtime,
            &["ssh".to_string()],
            &[Port::new("22000", Protocol::Udp)],
        );
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.applied, vec!["ssh", "22000/udp"]);
    }
}
