// Zonekeeper - Backup Store
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! File-based snapshots of persisted zone definitions.
//!
//! Snapshots live in one directory as
//! `<zone>--<YYYYmmdd-HHMMSS-mmm>[--<escaped description>].xml`, holding the
//! zone's XML byte-for-byte. Restoring first copies the live file to
//! `pre-restore/<zone>--<nanos>.xml` so the state before the restore can be
//! brought back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeDelta};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, info, warn};

use crate::error::{BackupError, Error, Result};
use crate::models::validate_zone_name;

/// Characters escaped in the description segment of a snapshot name.
const DESCRIPTION: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const SEPARATOR: &str = "--";
const EXTENSION: &str = ".xml";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
/// `YYYYmmdd-HHMMSS-mmm`
const TIMESTAMP_LEN: usize = 19;
const PRE_RESTORE_DIR: &str = "pre-restore";

/// One snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub zone: String,
    pub timestamp: NaiveDateTime,
    pub size: u64,
    pub description: Option<String>,
}

impl Backup {
    /// One-line summary for lists.
    pub fn label(&self) -> String {
        let when = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match &self.description {
            Some(d) => format!("{when}  {d}"),
            None => when.to_string(),
        }
    }
}

/// Archive of zone snapshots with per-zone retention.
#[derive(Debug, Clone)]
pub struct BackupStore {
    backup_dir: PathBuf,
    zones_dir: PathBuf,
    retention: usize,
}

impl BackupStore {
    /// `retention` is the number of snapshots kept per zone; zero keeps all.
    pub fn new(backup_dir: impl Into<PathBuf>, zones_dir: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            zones_dir: zones_dir.into(),
            retention,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn live_path(&self, zone: &str) -> PathBuf {
        self.zones_dir.join(format!("{zone}{EXTENSION}"))
    }

    fn pre_restore_dir(&self) -> PathBuf {
        self.backup_dir.join(PRE_RESTORE_DIR)
    }

    /// Snapshot the persisted definition of `zone`.
    pub fn create(&self, zone: &str, description: Option<&str>) -> Result<Backup> {
        validate_zone_name(zone)?;

        let source = self.live_path(zone);
        if !source.is_file() {
            return Err(BackupError::MissingSource {
                zone: zone.to_string(),
                path: source,
            }
            .into());
        }

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| BackupError::io("create directory", &self.backup_dir, &e))?;

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let mut timestamp = truncate_to_millis(Local::now().naive_local());
        let mut target = self.snapshot_path(zone, timestamp, description);
        while target.exists() {
            timestamp += TimeDelta::milliseconds(1);
            target = self.snapshot_path(zone, timestamp, description);
        }

        copy_atomic(&source, &target)?;
        let size = fs::metadata(&target).map(|m| m.len()).unwrap_or_default();
        info!("Backed up zone {} to {}", zone, target.display());

        self.prune(zone);

        Ok(Backup {
            path: target,
            zone: zone.to_string(),
            timestamp,
            size,
            description: description.map(str::to_string),
        })
    }

    fn snapshot_path(&self, zone: &str, timestamp: NaiveDateTime, description: Option<&str>) -> PathBuf {
        let mut name = format!(
            "{zone}{SEPARATOR}{}-{:03}",
            timestamp.format(TIMESTAMP_FORMAT),
            timestamp.and_utc().timestamp_subsec_millis()
        );
        if let Some(d) = description {
            name.push_str(SEPARATOR);
            name.extend(utf8_percent_encode(d, DESCRIPTION));
        }
        name.push_str(EXTENSION);
        self.backup_dir.join(name)
    }

    /// Snapshots of `zone`, newest first.
    pub fn list(&self, zone: &str) -> Result<Vec<Backup>> {
        validate_zone_name(zone)?;

        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io("read directory", &self.backup_dir, &e).into()),
        };

        let mut backups: Vec<Backup> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let name = path.file_name()?.to_str()?.to_string();
                let (timestamp, description) = parse_snapshot_name(zone, &name)?;
                let size = entry.metadata().map(|m| m.len()).unwrap_or_default();
                Some(Backup {
                    path,
                    zone: zone.to_string(),
                    timestamp,
                    size,
                    description,
                })
            })
            .collect();

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.path.cmp(&a.path)));
        Ok(backups)
    }

    /// Keep the newest `retention` snapshots of `zone`. Never fails.
    fn prune(&self, zone: &str) {
        if self.retention == 0 {
            return;
        }
        let backups = match self.list(zone) {
            Ok(b) => b,
            Err(e) => {
                warn!("Skipping pruning for zone {}: {}", zone, e);
                return;
            }
        };
        for old in backups.iter().skip(self.retention) {
            match fs::remove_file(&old.path) {
                Ok(()) => debug!("Pruned backup {}", old.path.display()),
                Err(e) => warn!("Failed to prune backup {}: {}", old.path.display(), e),
            }
        }
    }

    /// Replace the live definition of `zone` with `backup`.
    ///
    /// Returns the pre-restore marker holding the replaced content, or `None`
    /// when the zone had no persisted definition.
    pub fn restore(&self, zone: &str, backup: &Backup) -> Result<Option<PathBuf>> {
        validate_zone_name(zone)?;
        if backup.zone != zone {
            return Err(Error::invalid(format!(
                "Backup belongs to zone '{}', not '{zone}'",
                backup.zone
            )));
        }
        if !backup.path.is_file() {
            return Err(Error::NotFound(format!("backup {}", backup.path.display())));
        }

        let live = self.live_path(zone);
        let marker = if live.is_file() {
            let marker = self.next_marker(zone)?;
            copy_atomic(&live, &marker)?;
            debug!("Saved pre-restore state of {} to {}", zone, marker.display());
            Some(marker)
        } else {
            None
        };

        fs::create_dir_all(&self.zones_dir)
            .map_err(|e| BackupError::io("create directory", &self.zones_dir, &e))?;
        copy_atomic(&backup.path, &live)?;

        info!("Restored zone {} from {}", zone, backup.path.display());
        Ok(marker)
    }

    fn next_marker(&self, zone: &str) -> Result<PathBuf> {
        let dir = self.pre_restore_dir();
        fs::create_dir_all(&dir).map_err(|e| BackupError::io("create directory", &dir, &e))?;

        let now = Local::now().timestamp_nanos_opt().unwrap_or_default().max(0) as u128;
        let nanos = match self.markers(zone)?.last() {
            Some((latest, _)) if *latest >= now => latest + 1,
            _ => now,
        };
        Ok(dir.join(format!("{zone}{SEPARATOR}{nanos}{EXTENSION}")))
    }

    /// Pre-restore markers of `zone`, oldest first.
    fn markers(&self, zone: &str) -> Result<Vec<(u128, PathBuf)>> {
        let dir = self.pre_restore_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io("read directory", &dir, &e).into()),
        };

        let prefix = format!("{zone}{SEPARATOR}");
        let mut markers: Vec<(u128, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let nanos = path
                    .file_name()?
                    .to_str()?
                    .strip_prefix(&prefix)?
                    .strip_suffix(EXTENSION)?
                    .parse()
                    .ok()?;
                Some((nanos, path))
            })
            .collect();
        markers.sort();
        Ok(markers)
    }

    /// The most recent pre-restore marker of `zone`.
    pub fn latest_pre_restore(&self, zone: &str) -> Result<Option<PathBuf>> {
        validate_zone_name(zone)?;
        Ok(self.markers(zone)?.pop().map(|(_, path)| path))
    }

    /// Delete a marker returned by this store.
    pub fn remove_pre_restore(&self, marker: &Path) -> Result<()> {
        if marker.parent() != Some(self.pre_restore_dir().as_path()) {
            return Err(Error::invalid(format!(
                "{} is not a pre-restore marker",
                marker.display()
            )));
        }
        fs::remove_file(marker).map_err(|e| BackupError::io("remove", marker, &e))?;
        Ok(())
    }

    /// Put back the content saved by the last restore of `zone`, then drop the marker.
    pub fn revert_restore(&self, zone: &str) -> Result<PathBuf> {
        let marker = self
            .latest_pre_restore(zone)?
            .ok_or_else(|| Error::NotFound(format!("pre-restore state for zone '{zone}'")))?;
        copy_atomic(&marker, &self.live_path(zone))?;
        self.remove_pre_restore(&marker)?;
        info!("Reverted last restore of zone {}", zone);
        Ok(marker)
    }
}

fn truncate_to_millis(t: NaiveDateTime) -> NaiveDateTime {
    let extra = t.and_utc().timestamp_subsec_nanos() % 1_000_000;
    t - TimeDelta::nanoseconds(i64::from(extra))
}

/// Split a snapshot file name into its timestamp and decoded description.
fn parse_snapshot_name(zone: &str, file_name: &str) -> Option<(NaiveDateTime, Option<String>)> {
    let rest = file_name
        .strip_prefix(zone)?
        .strip_prefix(SEPARATOR)?
        .strip_suffix(EXTENSION)?;
    if rest.len() < TIMESTAMP_LEN || !rest.is_char_boundary(TIMESTAMP_LEN) {
        return None;
    }
    let (stamp, tail) = rest.split_at(TIMESTAMP_LEN);

    let (seconds, millis) = stamp.rsplit_once('-')?;
    let millis: i64 = millis.parse().ok().filter(|m| (0..1000).contains(m))?;
    let timestamp = NaiveDateTime::parse_from_str(seconds, TIMESTAMP_FORMAT).ok()?
        + TimeDelta::milliseconds(millis);

    let description = match tail {
        "" => None,
        _ => Some(
            percent_decode_str(tail.strip_prefix(SEPARATOR)?)
                .decode_utf8_lossy()
                .into_owned(),
        ),
    };
    Some((timestamp, description))
}

/// Copy through a temporary sibling and rename into place.
fn copy_atomic(from: &Path, to: &Path) -> Result<()> {
    let tmp = to.with_extension("xml.tmp");
    fs::copy(from, &tmp).map_err(|e| BackupError::io("copy to", &tmp, &e))?;
    if let Err(e) = fs::rename(&tmp, to) {
        let _ = fs::remove_file(&tmp);
        return Err(BackupError::io("rename to", to, &e).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        _dir: TempDir,
        zones: PathBuf,
        store: BackupStore,
    }

    fn fixture(retention: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let zones = dir.path().join("zones");
        fs::create_dir_all(&zones).unwrap();
        let store = BackupStore::new(dir.path().join("backups"), &zones, retention);
        Fixture { _dir: dir, zones, store }
    }

    fn write_zone(f: &Fixture, zone: &str, content: &str) {
        fs::write(f.zones.join(format!("{zone}.xml")), content).unwrap();
    }

    fn place(f: &Fixture, name: &str) {
        fs::create_dir_all(f.store.backup_dir()).unwrap();
        fs::write(f.store.backup_dir().join(name), "<zone/>").unwrap();
    }

    #[test]
    fn test_create_copies_bytes() {
        let f = fixture(10);
        write_zone(&f, "public", "<zone><service name=\"ssh\"/></zone>\n");

        let backup = f.store.create("public", Some("before tuning")).unwrap();
        assert_eq!(
            fs::read_to_string(&backup.path).unwrap(),
            "<zone><service name=\"ssh\"/></zone>\n"
        );
        assert_eq!(backup.description.as_deref(), Some("before tuning"));
        assert!(backup
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("--before%20tuning.xml"));

        let listed = f.store.list("public").unwrap();
        assert_eq!(listed, vec![backup]);
    }

    #[test]
    fn test_missing_source_is_distinguishable() {
        let f = fixture(10);
        let err = f.store.create("home", None).unwrap_err();
        assert!(err.is_missing_backup_source());
    }

    #[test]
    fn test_list_newest_first_and_decodes_descriptions() {
        let f = fixture(10);
        place(&f, "public--20260101-120000-000--release%20backup.xml");
        place(&f, "public--20260301-080000-500.xml");
        place(&f, "public--20260201-235959-999--a%2Fb.xml");
        place(&f, "publicity--20260401-000000-000.xml");
        place(&f, "public--garbage.xml");

        let listed = f.store.list("public").unwrap();
        let summary: Vec<(String, Option<String>)> = listed
            .iter()
            .map(|b| (b.timestamp.format("%Y-%m-%d").to_string(), b.description.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("2026-03-01".to_string(), None),
                ("2026-02-01".to_string(), Some("a/b".to_string())),
                ("2026-01-01".to_string(), Some("release backup".to_string())),
            ]
        );
    }

    #[test]
    fn test_retention_keeps_newest() {
        let f = fixture(3);
        write_zone(&f, "dmz", "<zone/>");
        for day in 1..=4 {
            place(&f, &format!("dmz--2020010{day}-000000-000.xml"));
        }
        place(&f, "work--20200101-000000-000.xml");

        let fresh = f.store.create("dmz", None).unwrap();
        let listed = f.store.list("dmz").unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0], fresh);
        assert_eq!(listed[2].timestamp.format("%d").to_string(), "03");
        assert_eq!(f.store.list("work").unwrap().len(), 1);
    }

    #[test]
    fn test_back_to_back_snapshots_do_not_collide() {
        let f = fixture(0);
        write_zone(&f, "public", "<zone/>");
        let a = f.store.create("public", None).unwrap();
        let b = f.store.create("public", None).unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(f.store.list("public").unwrap().len(), 2);
    }

    #[test]
    fn test_restore_saves_pre_restore_marker() {
        let f = fixture(10);
        write_zone(&f, "public", "original");
        let backup = f.store.create("public", None).unwrap();
        write_zone(&f, "public", "edited");

        let marker = f.store.restore("public", &backup).unwrap().unwrap();
        assert_eq!(fs::read_to_string(&marker).unwrap(), "edited");
        assert_eq!(fs::read_to_string(f.zones.join("public.xml")).unwrap(), "original");
        assert_eq!(f.store.latest_pre_restore("public").unwrap(), Some(marker.clone()));

        f.store.remove_pre_restore(&marker).unwrap();
        assert_eq!(f.store.latest_pre_restore("public").unwrap(), None);
    }

    #[test]
    fn test_markers_strictly_increase() {
        let f = fixture(10);
        write_zone(&f, "public", "v1");
        let backup = f.store.create("public", None).unwrap();
        let first = f.store.restore("public", &backup).unwrap().unwrap();
        let second = f.store.restore("public", &backup).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(f.store.latest_pre_restore("public").unwrap(), Some(second));
    }

    #[test]
    fn test_revert_restore() {
        let f = fixture(10);
        write_zone(&f, "home", "old");
        let backup = f.store.create("home", None).unwrap();
        write_zone(&f, "home", "new");
        f.store.restore("home", &backup).unwrap();

        f.store.revert_restore("home").unwrap();
        assert_eq!(fs::read_to_string(f.zones.join("home.xml")).unwrap(), "new");
        assert!(matches!(f.store.revert_restore("home"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_unsafe_zone_names_rejected() {
        let f = fixture(10);
        for bad in ["../x", "a/b", "a\\b", ""] {
            assert!(matches!(f.store.create(bad, None), Err(Error::Validation(_))));
            assert!(matches!(f.store.list(bad), Err(Error::Validation(_))));
        }
    }

    #[test]
    fn test_remove_pre_restore_refuses_foreign_paths() {
        let f = fixture(10);
        let err = f.store.remove_pre_restore(&f.zones.join("public.xml")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
