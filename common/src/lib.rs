#![allow(missing_docs)]

pub mod collectors;
pub mod config;
pub mod enumerators;
pub mod error;
pub mod identity;
pub mod logon;
pub mod native;
pub mod protocol;
pub mod telemetry;

pub use config::{ConfigManager, ReportKind, WardenConfig};
pub use enumerators::Enumerator;
pub use error::{ErrorCode, WardenError};
pub use identity::{HostIdentity, NetHostIdentity};
pub use logon::{ProcessOwner, ProcessOwnerMap, ProcessOwners, SessionCorrelator};
