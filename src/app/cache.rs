// Zonekeeper - Zone Cache
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Short-lived cache of fetched zones, keyed by zone and view.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::{View, Zone};

#[derive(Debug, Clone)]
struct Entry {
    zone: Zone,
    fetched_at: Instant,
}

/// Zone cache manager.
#[derive(Debug)]
pub struct ZoneCache {
    entries: HashMap<(String, View), Entry>,
    /// Maximum age before an entry is considered stale.
    ttl: Duration,
}

impl ZoneCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// A fresh copy of the zone, if one is cached.
    pub fn get(&self, zone: &str, view: View) -> Option<&Zone> {
        let entry = self.entries.get(&(zone.to_string(), view))?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(&entry.zone)
    }

    pub fn insert(&mut self, view: View, zone: Zone) {
        let key = (zone.name.clone(), view);
        self.entries.insert(
            key,
            Entry {
                zone,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop both views of `zone`.
    pub fn invalidate(&mut self, zone: &str) {
        self.entries.retain(|(name, _), _| name != zone);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_invalidate() {
        let mut cache = ZoneCache::new(Duration::from_secs(60));
        cache.insert(View::Runtime, Zone::new("public"));
        cache.insert(View::Permanent, Zone::new("public"));
        cache.insert(View::Runtime, Zone::new("home"));

        assert!(cache.get("public", View::Runtime).is_some());
        assert!(cache.get("public", View::Permanent).is_some());

        cache.invalidate("public");
        assert!(cache.get("public", View::Runtime).is_none());
        assert!(cache.get("public", View::Permanent).is_none());
        assert!(cache.get("home", View::Runtime).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entries_expire() {
        let mut cache = ZoneCache::new(Duration::ZERO);
        cache.insert(View::Runtime, Zone::new("public"));
        assert!(cache.get("public", View::Runtime).is_none());
    }

    #[test]
    fn test_views_are_separate() {
        let mut cache = ZoneCache::new(Duration::from_secs(60));
        let mut zone = Zone::new("dmz");
        zone.masquerade = true;
        cache.insert(View::Permanent, zone);
        assert!(cache.get("dmz", View::Runtime).is_none());
        assert!(cache.get("dmz", View::Permanent).unwrap().masquerade);
        cache.clear();
        assert!(cache.is_empty());
    }
}
