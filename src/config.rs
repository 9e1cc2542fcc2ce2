// Zonekeeper - Configuration
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Application settings management using a local JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BackupError, Error, Result};
use crate::models::Port;

/// A named bundle of services and ports applied to a zone in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: Vec<String>,
    /// Ports as `port/protocol`.
    #[serde(default)]
    pub ports: Vec<String>,
}

impl Template {
    /// Parsed ports; entries that do not parse are logged and skipped.
    pub fn parsed_ports(&self) -> Vec<Port> {
        self.ports
            .iter()
            .filter_map(|p| match Port::parse(p) {
                Ok(port) => Some(port),
                Err(e) => {
                    warn!("Template {}: skipping port {}: {}", self.name, p, e);
                    None
                }
            })
            .collect()
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Where zone snapshots are written.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// Where firewalld keeps persisted zone definitions.
    #[serde(default = "default_zones_dir")]
    pub zones_dir: PathBuf,
    /// Service definition directories, user overrides first.
    #[serde(default = "default_service_dirs")]
    pub service_dirs: Vec<PathBuf>,
    /// Snapshots kept per zone (0 keeps all).
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default = "default_undo_capacity")]
    pub undo_capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Minimum spacing between mutating bus calls.
    #[serde(default = "default_min_call_interval_ms")]
    pub min_call_interval_ms: u64,
    /// Panic mode switches itself off after this long (0 disables).
    #[serde(default = "default_panic_timeout_secs")]
    pub panic_timeout_secs: u64,
    /// Countdown before a destructive confirmation accepts `y`.
    #[serde(default = "default_confirm_delay_secs")]
    pub confirm_delay_secs: u64,
    /// Start in the permanent view.
    #[serde(default)]
    pub start_permanent: bool,
    #[serde(default = "default_templates")]
    pub templates: Vec<Template>,
}

fn default_backup_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zonekeeper")
        .join("backups")
}

fn default_zones_dir() -> PathBuf {
    PathBuf::from("/etc/firewalld/zones")
}

fn default_service_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc/firewalld/services"),
        PathBuf::from("/usr/lib/firewalld/services"),
    ]
}

fn default_backup_retention() -> usize {
    10
}

fn default_undo_capacity() -> usize {
    50
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_min_call_interval_ms() -> u64 {
    150
}

fn default_panic_timeout_secs() -> u64 {
    300
}

fn default_confirm_delay_secs() -> u64 {
    3
}

fn default_templates() -> Vec<Template> {
    let template = |name: &str, description: &str, services: &[&str], ports: &[&str]| Template {
        name: name.to_string(),
        description: description.to_string(),
        services: services.iter().map(|s| s.to_string()).collect(),
        ports: ports.iter().map(|p| p.to_string()).collect(),
    };
    vec![
        template("Web server", "HTTP and HTTPS", &["http", "https"], &[]),
        template("Remote admin", "SSH and Cockpit", &["ssh", "cockpit"], &[]),
        template("Mail server", "SMTP, submission and IMAPS", &["smtp", "smtp-submission", "imaps"], &[]),
        template("Dev server", "Common development ports", &[], &["3000/tcp", "5173/tcp", "8080/tcp"]),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            zones_dir: default_zones_dir(),
            service_dirs: default_service_dirs(),
            backup_retention: default_backup_retention(),
            undo_capacity: default_undo_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
            min_call_interval_ms: default_min_call_interval_ms(),
            panic_timeout_secs: default_panic_timeout_secs(),
            confirm_delay_secs: default_confirm_delay_secs(),
            start_permanent: false,
            templates: default_templates(),
        }
    }
}

impl Settings {
    /// Default location of the settings file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zonekeeper")
            .join("settings.json")
    }

    /// Load settings from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings: {}", e);
                Self::default()
            }
        }
    }

    /// Write settings to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BackupError::io("create directory", parent, &e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::invalid(format!("Failed to serialize settings: {e}")))?;
        fs::write(path, content).map_err(|e| BackupError::io("write", path, &e))?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    pub fn panic_timeout(&self) -> Option<Duration> {
        (self.panic_timeout_secs > 0).then(|| Duration::from_secs(self.panic_timeout_secs))
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_secs(self.confirm_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "undo_capacity": 5, "panic_timeout_secs": 0 }"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.undo_capacity, 5);
        assert_eq!(settings.panic_timeout(), None);
        assert_eq!(settings.backup_retention, 10);
        assert_eq!(settings.cache_ttl(), Duration::from_secs(30));
        assert!(!settings.templates.is_empty());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path).min_call_interval_ms, 150);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            start_permanent: true,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert!(Settings::load(&path).start_permanent);
    }

    #[test]
    fn test_template_ports_skip_invalid() {
        let template = Template {
            name: "t".into(),
            description: String::new(),
            services: vec![],
            ports: vec!["8080/tcp".into(), "99999/tcp".into(), "53/udp".into()],
        };
        let keys: Vec<String> = template.parsed_ports().iter().map(Port::key).collect();
        assert_eq!(keys, vec!["8080/tcp", "53/udp"]);
    }
}
