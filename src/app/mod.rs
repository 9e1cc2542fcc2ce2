// Zonekeeper - Application State
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! The dispatch loop's state machine: model, messages and `update`.

mod cache;
mod keys;
mod message;
mod model;
pub mod overlays;
mod update;

pub use cache::ZoneCache;
pub use message::{Msg, ZoneList};
pub use model::{Feature, Model, Slot, Status, Tab};
pub use update::{init, update};
