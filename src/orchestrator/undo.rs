// Zonekeeper - Undo Log
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Bounded undo and redo stacks.

use std::collections::VecDeque;

use super::Step;
use crate::models::View;

/// A completed change and the steps that reverse and repeat it.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoAction {
    pub label: String,
    pub zone: String,
    pub view: View,
    pub undo: Step,
    pub redo: Step,
}

impl UndoAction {
    /// The action recorded after `step` has been applied.
    pub fn for_applied(step: &Step) -> Self {
        Self {
            label: step.describe(),
            zone: step.zone().to_string(),
            view: step.view(),
            undo: step.inverse(),
            redo: step.clone(),
        }
    }
}

/// Two stacks that drop their oldest entry when full.
#[derive(Debug, Clone)]
pub struct UndoLog {
    undo: VecDeque<UndoAction>,
    redo: VecDeque<UndoAction>,
    capacity: usize,
}

impl UndoLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            capacity,
        }
    }

    fn push(stack: &mut VecDeque<UndoAction>, capacity: usize, action: UndoAction) {
        if capacity == 0 {
            return;
        }
        while stack.len() >= capacity {
            stack.pop_front();
        }
        stack.push_back(action);
    }

    pub fn push_undo(&mut self, action: UndoAction) {
        Self::push(&mut self.undo, self.capacity, action);
    }

    pub fn push_redo(&mut self, action: UndoAction) {
        Self::push(&mut self.redo, self.capacity, action);
    }

    pub fn pop_undo(&mut self) -> Option<UndoAction> {
        self.undo.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<UndoAction> {
        self.redo.pop_back()
    }

    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Label of the action `undo` would reverse.
    pub fn peek_undo(&self) -> Option<&UndoAction> {
        self.undo.back()
    }

    pub fn peek_redo(&self) -> Option<&UndoAction> {
        self.redo.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Change, Mutation, Op};

    fn action(n: usize) -> UndoAction {
        UndoAction::for_applied(&Step::Apply(Mutation {
            zone: "public".into(),
            view: View::Runtime,
            op: Op::Add,
            change: Change::Service(format!("svc-{n}")),
        }))
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let capacity = 10;
        let mut log = UndoLog::new(capacity);
        for n in 0..capacity + 5 {
            log.push_undo(action(n));
            log.push_redo(action(n));
        }
        assert_eq!(log.undo_len(), capacity);
        assert_eq!(log.redo_len(), capacity);

        let mut kept = Vec::new();
        while let Some(a) = log.pop_undo() {
            kept.push(a.label);
        }
        assert_eq!(kept.len(), capacity);
        for n in capacity..capacity + 5 {
            assert!(kept.contains(&format!("add service svc-{n}")));
        }
        assert!(!kept.contains(&"add service svc-0".to_string()));
        assert!(!kept.contains(&"add service svc-4".to_string()));
        assert_eq!(kept.last().unwrap(), "add service svc-5");
    }

    #[test]
    fn test_lifo_order() {
        let mut log = UndoLog::new(3);
        log.push_undo(action(1));
        log.push_undo(action(2));
        assert_eq!(log.peek_undo().unwrap().label, "add service svc-2");
        assert_eq!(log.pop_undo().unwrap().label, "add service svc-2");
        assert_eq!(log.pop_undo().unwrap().label, "add service svc-1");
        assert!(log.pop_undo().is_none());

        log.push_redo(action(3));
        assert_eq!(log.peek_redo().unwrap().label, "add service svc-3");
        assert_eq!(log.redo_len(), 1);
    }

    #[test]
    fn test_action_for_applied_inverts() {
        let a = action(7);
        match (&a.undo, &a.redo) {
            (Step::Apply(undo), Step::Apply(redo)) => {
                assert_eq!(undo.op, Op::Remove);
                assert_eq!(redo.op, Op::Add);
                assert_eq!(undo.change, redo.change);
            }
            other => panic!("unexpected steps {other:?}"),
        }
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut log = UndoLog::new(0);
        log.push_undo(action(1));
        assert_eq!(log.undo_len(), 0);
    }
}
