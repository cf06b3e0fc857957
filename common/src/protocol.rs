use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenFile {
    pub id: u32,
    pub permissions: u32,
    pub num_locks: u32,
    pub path: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkFile {
    pub id: u32,
    pub permissions: u32,
    pub num_locks: u32,
    pub path: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkShare {
    pub name: String,
    pub share_type: String,
    pub comment: String,
    pub permissions: u32,
    pub max_uses: u32,
    pub current_uses: u32,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSession {
    pub client_name: String,
    pub username: String,
    pub num_opens: u32,
    pub time: Duration,
    pub idle_time: Duration,
    pub user_flags: u32,
    pub client_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LogonType {
    #[serde(rename = "INTERACTIVE_LOGON")]
    Interactive,
    #[serde(rename = "REMOTE_INTERACTIVE_LOGON")]
    RemoteInteractive,
    #[serde(rename = "CACHED_INTERACTIVE_LOGON")]
    CachedInteractive,
}

impl LogonType {
    pub const INTERACTIVE: u32 = 2;
    pub const REMOTE_INTERACTIVE: u32 = 10;
    pub const CACHED_INTERACTIVE: u32 = 11;

    /// Only the human-at-the-console kinds map; service, batch, network,
    /// unlock and the rest are `None`.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            Self::INTERACTIVE => Some(LogonType::Interactive),
            Self::REMOTE_INTERACTIVE => Some(LogonType::RemoteInteractive),
            Self::CACHED_INTERACTIVE => Some(LogonType::CachedInteractive),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            LogonType::Interactive => Self::INTERACTIVE,
            LogonType::RemoteInteractive => Self::REMOTE_INTERACTIVE,
            LogonType::CachedInteractive => Self::CACHED_INTERACTIVE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogonType::Interactive => "INTERACTIVE_LOGON",
            LogonType::RemoteInteractive => "REMOTE_INTERACTIVE_LOGON",
            LogonType::CachedInteractive => "CACHED_INTERACTIVE_LOGON",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDetails {
    pub username: String,
    pub domain: String,
    pub identity: String,
    pub logon_id: String,
    pub logon_type: LogonType,
    pub local_user: bool,
    pub local_admin: bool,
    pub logon_time: SystemTime,
    pub dns_domain_name: String,
    pub authentication_package: String,
    pub logon_server: String,
}

const STYPE_MASK: u32 = 0x0000_00ff;
const STYPE_DISKTREE: u32 = 0;
const STYPE_PRINTQ: u32 = 1;
const STYPE_DEVICE: u32 = 2;
const STYPE_IPC: u32 = 3;
const STYPE_TEMPORARY: u32 = 0x4000_0000;
const STYPE_SPECIAL: u32 = 0x8000_0000;

pub fn describe_share_type(raw: u32) -> String {
    let base = match raw & STYPE_MASK {
        STYPE_DISKTREE => "Disk",
        STYPE_PRINTQ => "Print Queue",
        STYPE_DEVICE => "Device",
        STYPE_IPC => "IPC",
        _ => "Unknown",
    };
    let mut out = base.to_string();
    if raw & STYPE_SPECIAL != 0 {
        out.push_str(" (special)");
    }
    if raw & STYPE_TEMPORARY != 0 {
        out.push_str(" (temporary)");
    }
    out
}
