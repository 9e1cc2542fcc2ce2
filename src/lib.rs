// Zonekeeper - Library Root
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Zonekeeper - an interactive terminal tool for firewalld zones.
//!
//! The crate is split into the D-Bus gateway ([`firewall`]), plain data
//! ([`models`]), the mutation layer ([`orchestrator`]), zone snapshots
//! ([`backup`]), the dispatch loop state machine ([`app`]) and the
//! terminal front end ([`runtime`], [`tui`], [`ui`]).

pub mod app;
pub mod backup;
pub mod config;
pub mod error;
pub mod firewall;
pub mod models;
pub mod orchestrator;
pub mod runtime;
pub mod tui;
pub mod ui;
