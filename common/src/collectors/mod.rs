//! Host-facing entry points. On Windows they bind the enumerators and the
//! correlator to the real netapi32/secur32 surface; elsewhere they report
//! `Unsupported`.

use std::collections::HashMap;

use sysinfo::System;

use crate::config::{EnumerationConfig, SessionConfig};
use crate::error::WardenError;
use crate::native::Luid;
use crate::protocol::{NetworkFile, NetworkSession, NetworkShare, OpenFile, SessionDetails};

#[cfg(windows)]
pub mod windows;

#[cfg(windows)]
use crate::enumerators::Enumerator;
#[cfg(windows)]
use crate::identity::NetHostIdentity;
#[cfg(windows)]
use crate::logon::{SessionCorrelator, logon_session_users};
#[cfg(windows)]
use self::windows::{SystemLsa, SystemNetApi, SystemProcessOwners};

/// Host name as the OS reports it; empty when it cannot be read.
pub fn local_host_name() -> String {
    System::host_name().unwrap_or_default()
}

#[cfg(windows)]
#[allow(clippy::missing_errors_doc)]
pub fn list_open_files(cfg: &EnumerationConfig) -> Result<Vec<OpenFile>, WardenError> {
    Enumerator::with_config(&SystemNetApi, cfg).open_files()
}

#[cfg(not(windows))]
#[allow(clippy::missing_errors_doc)]
pub fn list_open_files(_cfg: &EnumerationConfig) -> Result<Vec<OpenFile>, WardenError> {
    Err(WardenError::Unsupported { op: "list_open_files" })
}

#[cfg(windows)]
#[allow(clippy::missing_errors_doc)]
pub fn list_network_files(cfg: &EnumerationConfig) -> Result<Vec<NetworkFile>, WardenError> {
    Enumerator::with_config(&SystemNetApi, cfg).network_files()
}

#[cfg(not(windows))]
#[allow(clippy::missing_errors_doc)]
pub fn list_network_files(_cfg: &EnumerationConfig) -> Result<Vec<NetworkFile>, WardenError> {
    Err(WardenError::Unsupported {
        op: "list_network_files",
    })
}

#[cfg(windows)]
#[allow(clippy::missing_errors_doc)]
pub fn list_network_shares(cfg: &EnumerationConfig) -> Result<Vec<NetworkShare>, WardenError> {
    Enumerator::with_config(&SystemNetApi, cfg).network_shares()
}

#[cfg(not(windows))]
#[allow(clippy::missing_errors_doc)]
pub fn list_network_shares(_cfg: &EnumerationConfig) -> Result<Vec<NetworkShare>, WardenError> {
    Err(WardenError::Unsupported {
        op: "list_network_shares",
    })
}

#[cfg(windows)]
#[allow(clippy::missing_errors_doc)]
pub fn list_network_sessions(
    cfg: &EnumerationConfig,
) -> Result<Vec<NetworkSession>, WardenError> {
    Enumerator::with_config(&SystemNetApi, cfg).network_sessions()
}

#[cfg(not(windows))]
#[allow(clippy::missing_errors_doc)]
pub fn list_network_sessions(
    _cfg: &EnumerationConfig,
) -> Result<Vec<NetworkSession>, WardenError> {
    Err(WardenError::Unsupported {
        op: "list_network_sessions",
    })
}

#[cfg(windows)]
#[allow(clippy::missing_errors_doc)]
pub fn list_logged_in_users(cfg: &SessionConfig) -> Result<Vec<SessionDetails>, WardenError> {
    let identity = NetHostIdentity::new(&SystemNetApi, local_host_name(), cfg);
    SessionCorrelator::new(&SystemLsa, &SystemProcessOwners, &identity, cfg).logged_in_users()
}

#[cfg(not(windows))]
#[allow(clippy::missing_errors_doc)]
pub fn list_logged_in_users(_cfg: &SessionConfig) -> Result<Vec<SessionDetails>, WardenError> {
    Err(WardenError::Unsupported {
        op: "list_logged_in_users",
    })
}

#[cfg(windows)]
#[allow(clippy::missing_errors_doc)]
pub fn list_logon_session_users() -> Result<HashMap<Luid, String>, WardenError> {
    logon_session_users(&SystemLsa)
}

#[cfg(not(windows))]
#[allow(clippy::missing_errors_doc)]
pub fn list_logon_session_users() -> Result<HashMap<Luid, String>, WardenError> {
    Err(WardenError::Unsupported {
        op: "list_logon_session_users",
    })
}
