// Zonekeeper - Errors
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Error taxonomy shared by the gateway, the backup store and the orchestrator.
//!
//! D-Bus errors never leave the gateway raw: `From<zbus::Error>` translates
//! them into the variants below so the dispatch loop can tell an
//! authorization failure from a vanished zone or an old daemon.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure an operation can report.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Connection ───────────────────────────────────────────────────
    #[error("firewalld is not running: {0}")]
    NotRunning(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // ── Target ───────────────────────────────────────────────────────
    #[error("Invalid zone '{zone}'")]
    InvalidZone { zone: String },

    #[error("Not supported by this firewalld version: {operation}")]
    UnsupportedApi { operation: String },

    #[error("Not found: {0}")]
    NotFound(String),

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Unexpected reply shape for {field}: got {found}")]
    Decode { field: String, found: String },

    #[error("{0}")]
    Validation(String),

    // ── Backups ──────────────────────────────────────────────────────
    #[error("Backup failed: {0}")]
    Backup(#[from] BackupError),

    // ── Transactions ─────────────────────────────────────────────────
    #[error(
        "{original}; rollback also failed ({rollback}), '{value}' could not be restored \
         and neither the old nor the new value is present"
    )]
    RollbackFailed {
        original: Box<Error>,
        rollback: Box<Error>,
        value: String,
    },

    // ── Transport ────────────────────────────────────────────────────
    #[error("D-Bus error: {0}")]
    Transport(String),
}

/// Failures of the snapshot archive.
#[derive(Debug, Clone, Error)]
pub enum BackupError {
    /// The zone has no persisted definition file to copy.
    #[error("no persisted definition for zone '{zone}' at {}", path.display())]
    MissingSource { zone: String, path: PathBuf },

    #[error("{action} {}: {message}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl BackupError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when a backup could not be taken only because nothing is persisted yet.
    pub fn is_missing_backup_source(&self) -> bool {
        matches!(self, Self::Backup(BackupError::MissingSource { .. }))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedApi { .. })
    }

    /// Attach the zone name to an `InvalidZone` raised without one.
    pub(crate) fn for_zone(self, zone: &str) -> Self {
        match self {
            Self::InvalidZone { zone: z } if z.is_empty() => Self::InvalidZone {
                zone: zone.to_string(),
            },
            other => other,
        }
    }

    /// Name the operation of an `UnsupportedApi` raised without one.
    pub(crate) fn for_operation(self, operation: &str) -> Self {
        match self {
            Self::UnsupportedApi { operation: op } if op.is_empty() => Self::UnsupportedApi {
                operation: operation.to_string(),
            },
            other => other,
        }
    }
}

// ── Conversion from D-Bus errors ─────────────────────────────────────

const NAME_HAS_NO_OWNER: &str = "org.freedesktop.DBus.Error.NameHasNoOwner";
const SERVICE_UNKNOWN: &str = "org.freedesktop.DBus.Error.ServiceUnknown";
const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";
const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
const UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
const NOT_AUTHORIZED: &str = "org.fedoraproject.FirewallD1.NotAuthorizedException";

/// Classify a D-Bus error by its name and the firewalld detail text.
///
/// firewalld reports its own failures as `org.fedoraproject.FirewallD1.Exception`
/// with a detail string starting with an upper-case code such as
/// `INVALID_ZONE: foo` or `ALREADY_ENABLED: http`.
pub(crate) fn classify_dbus_error(name: &str, detail: Option<&str>) -> Error {
    let detail = detail.unwrap_or_default();
    let code = detail.split(':').next().unwrap_or_default().trim();

    match name {
        NAME_HAS_NO_OWNER | SERVICE_UNKNOWN => return Error::NotRunning(detail.to_string()),
        ACCESS_DENIED | NOT_AUTHORIZED => return Error::PermissionDenied(detail.to_string()),
        UNKNOWN_METHOD | UNKNOWN_INTERFACE | UNKNOWN_OBJECT => {
            return Error::UnsupportedApi {
                operation: String::new(),
            }
        }
        _ => {}
    }

    match code {
        "INVALID_ZONE" | "ZONE_NOT_FOUND" => Error::InvalidZone {
            zone: detail
                .split_once(':')
                .map(|(_, z)| z.trim().trim_matches('\'').to_string())
                .unwrap_or_default(),
        },
        "NOT_AUTHORIZED" | "ACCESS_DENIED" => Error::PermissionDenied(detail.to_string()),
        _ if detail.contains("NotAuthorized") || detail.contains("not authorized") => {
            Error::PermissionDenied(detail.to_string())
        }
        _ if detail.is_empty() => Error::Transport(name.to_string()),
        _ => Error::Transport(detail.to_string()),
    }
}

impl From<zbus::Error> for Error {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, detail, _) => {
                classify_dbus_error(name.as_str(), detail.as_deref())
            }
            zbus::Error::FDO(fdo) => Self::from(*fdo),
            zbus::Error::Variant(e) => Self::Decode {
                field: "reply".to_string(),
                found: e.to_string(),
            },
            zbus::Error::InputOutput(e) => Self::NotRunning(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<zbus::fdo::Error> for Error {
    fn from(err: zbus::fdo::Error) -> Self {
        use zbus::fdo::Error as Fdo;

        match err {
            Fdo::ServiceUnknown(m) | Fdo::NameHasNoOwner(m) => Self::NotRunning(m),
            Fdo::AccessDenied(m) | Fdo::AuthFailed(m) | Fdo::InteractiveAuthorizationRequired(m) => {
                Self::PermissionDenied(m)
            }
            Fdo::UnknownMethod(_) | Fdo::UnknownInterface(_) | Fdo::UnknownObject(_) => {
                Self::UnsupportedApi {
                    operation: String::new(),
                }
            }
            other => Self::Transport(other.to_string()),
        }
    }
}
