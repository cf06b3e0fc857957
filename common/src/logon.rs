//! Logon-session correlation: joins the LSA logon-session table with the
//! live process owners and the host's admin groups to report who is
//! actually logged on.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::SessionConfig;
use crate::error::WardenError;
use crate::identity::{HostIdentity, eq_ignore_case};
use crate::native::{BufferRelease, Luid, NativeBuffer, SecurityLogonSessionData, UnicodeString};
use crate::protocol::{LogonType, SessionDetails};

/// `STATUS_SUCCESS`
pub const STATUS_SUCCESS: i32 = 0;

/// 100ns ticks between 1601-01-01 and 1970-01-01.
pub const FILETIME_UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: u64 = 10_000_000;
const NANOS_PER_TICK: u64 = 100;

const OP_ENUMERATE: &str = "LsaEnumerateLogonSessions";
const OP_SESSION_DATA: &str = "LsaGetLogonSessionData";

/// Out-parameters of the logon-session listing.
#[derive(Debug, Clone, Copy)]
pub struct RawLogonSessions {
    pub status: i32,
    pub count: u32,
    pub list: *mut u8,
}

/// The LSA logon-session surface.
///
/// # Safety
///
/// A successful `enumerate_logon_sessions` with a non-null `list` must point
/// at `count` consecutive LUIDs. A non-null `logon_session_data` result must
/// point at one session-data record whose counted strings are valid. Both
/// buffers stay valid until handed to `release`.
#[allow(unsafe_code)]
pub unsafe trait LsaApi: BufferRelease {
    fn enumerate_logon_sessions(&self) -> RawLogonSessions;

    /// Null when the session vanished or is not accessible.
    fn logon_session_data(&self, logon_id: &Luid) -> *mut u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOwner {
    pub logon_id: Luid,
    pub is_admin: bool,
}

/// Process id to the logon session that owns it.
pub type ProcessOwnerMap = HashMap<u32, ProcessOwner>;

pub trait ProcessOwners {
    #[allow(clippy::missing_errors_doc)]
    fn process_owners(&self) -> Result<ProcessOwnerMap, WardenError>;
}

/// Converts 100ns ticks since 1601 to a `SystemTime`. Anything before the
/// Unix epoch, including the zero a session without a logon time carries,
/// clamps to `UNIX_EPOCH` so the result always serializes.
pub fn filetime_to_system_time(ticks: u64) -> SystemTime {
    let Some(delta) = ticks.checked_sub(FILETIME_UNIX_EPOCH_TICKS) else {
        return UNIX_EPOCH;
    };
    let nanos = u32::try_from((delta % TICKS_PER_SECOND) * NANOS_PER_TICK).unwrap_or(0);
    UNIX_EPOCH
        .checked_add(Duration::new(delta / TICKS_PER_SECOND, nanos))
        .unwrap_or(UNIX_EPOCH)
}

/// `DOMAIN\user` with the domain upper-cased and the user lower-cased.
pub fn composite_identity(domain: &str, username: &str) -> String {
    format!("{}\\{}", domain.to_uppercase(), username.to_lowercase())
}

#[allow(unsafe_code)]
fn lsa_string(s: &UnicodeString) -> String {
    // SAFETY: only called on records still owned by a live NativeBuffer.
    unsafe { s.to_string_lossy() }
}

/// Walks every logon session that carries a security identifier. Session
/// data is fetched and released one session at a time; sessions whose data
/// cannot be fetched are skipped.
#[allow(unsafe_code, clippy::missing_errors_doc)]
pub fn visit_logon_sessions<L: LsaApi + ?Sized>(
    lsa: &L,
    mut visit: impl FnMut(&SecurityLogonSessionData),
) -> Result<(), WardenError> {
    let raw = lsa.enumerate_logon_sessions();
    if raw.status != STATUS_SUCCESS {
        return Err(WardenError::EnumerationFailed {
            op: OP_ENUMERATE,
            status: raw.status.cast_unsigned(),
        });
    }
    let count = usize::try_from(raw.count).unwrap_or(usize::MAX);
    // SAFETY: LsaApi guarantees a successful non-null list came from `lsa`.
    let list = match unsafe { NativeBuffer::adopt(lsa, OP_ENUMERATE, raw.list, count, count) } {
        Ok(list) => list,
        Err(WardenError::NullResult { .. }) => {
            tracing::debug!("no logon sessions listed");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // SAFETY: the list holds `count` LUIDs.
    for logon_id in unsafe { list.records::<Luid>() }? {
        let data_ptr = lsa.logon_session_data(logon_id);
        // SAFETY: LsaApi guarantees a non-null record came from `lsa`.
        let data = match unsafe { NativeBuffer::adopt(lsa, OP_SESSION_DATA, data_ptr, 1, 1) } {
            Ok(data) => data,
            Err(_) => {
                tracing::debug!(logon_id = %logon_id, "session data unavailable, skipping");
                continue;
            }
        };
        // SAFETY: the buffer holds exactly one session-data record.
        let record = match unsafe { data.records::<SecurityLogonSessionData>() } {
            Ok(mut records) => records.next(),
            Err(e) => {
                tracing::warn!(logon_id = %logon_id, error = %e, "session data unreadable, skipping");
                None
            }
        };
        let Some(record) = record else {
            continue;
        };
        if record.sid.is_null() {
            tracing::debug!(logon_id = %logon_id, "session has no sid, skipping");
            continue;
        }
        visit(record);
    }
    Ok(())
}

/// Every logon session with a security identifier, keyed by its LUID. No
/// logon-type filter and no liveness check.
#[allow(clippy::missing_errors_doc)]
pub fn logon_session_users<L: LsaApi + ?Sized>(
    lsa: &L,
) -> Result<HashMap<Luid, String>, WardenError> {
    let mut users = HashMap::new();
    visit_logon_sessions(lsa, |record| {
        let identity = composite_identity(
            &lsa_string(&record.logon_domain),
            &lsa_string(&record.user_name),
        );
        users.insert(record.logon_id, identity);
    })?;
    Ok(users)
}

pub struct SessionCorrelator<'a, L, P, H>
where
    L: LsaApi + ?Sized,
    P: ProcessOwners + ?Sized,
    H: HostIdentity + ?Sized,
{
    lsa: &'a L,
    owners: &'a P,
    identity: &'a H,
    cfg: &'a SessionConfig,
}

impl<'a, L, P, H> SessionCorrelator<'a, L, P, H>
where
    L: LsaApi + ?Sized,
    P: ProcessOwners + ?Sized,
    H: HostIdentity + ?Sized,
{
    pub fn new(lsa: &'a L, owners: &'a P, identity: &'a H, cfg: &'a SessionConfig) -> Self {
        Self {
            lsa,
            owners,
            identity,
            cfg,
        }
    }

    /// Interactive logons that still own at least one live process, one
    /// record per `DOMAIN\user`, in listing order.
    ///
    /// # Errors
    ///
    /// `DependencyUnavailable` when the process owners cannot be read, and
    /// `EnumerationFailed` when the logon-session listing itself fails.
    /// Anything wrong with a single session only skips that session.
    pub fn logged_in_users(&self) -> Result<Vec<SessionDetails>, WardenError> {
        let live = self.live_logon_ids()?;
        let host_name = self.identity.local_host_name();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut sessions = Vec::new();

        visit_logon_sessions(self.lsa, |record| {
            let Some(logon_type) = LogonType::from_raw(record.logon_type) else {
                return;
            };
            let domain = lsa_string(&record.logon_domain).to_uppercase();
            if self.is_excluded_domain(&domain) {
                tracing::debug!(domain = %domain, "pseudo-account session, skipping");
                return;
            }
            let username = lsa_string(&record.user_name);
            let identity = composite_identity(&domain, &username);
            if emitted.contains(&identity) {
                return;
            }
            let Some(&seed_admin) = live.get(&record.logon_id) else {
                tracing::debug!(
                    logon_id = %record.logon_id,
                    identity = %identity,
                    "no live process for session, skipping"
                );
                return;
            };
            emitted.insert(identity.clone());

            let dns_domain_name = lsa_string(&record.dns_domain_name);
            let local_user = eq_ignore_case(&domain, &host_name);
            let confirmed_admin = if local_user {
                self.admin_check("local", &username, self.identity.is_local_user_admin(&username))
            } else {
                self.admin_check(
                    "domain",
                    &username,
                    self.identity.is_domain_user_admin(&username, &dns_domain_name),
                )
            };

            sessions.push(SessionDetails {
                username,
                domain,
                identity,
                logon_id: record.logon_id.to_string(),
                logon_type,
                local_user,
                local_admin: seed_admin || confirmed_admin,
                logon_time: filetime_to_system_time(record.logon_time),
                dns_domain_name,
                authentication_package: lsa_string(&record.authentication_package),
                logon_server: lsa_string(&record.logon_server),
            });
        })?;

        tracing::debug!(sessions = sessions.len(), "logon sessions correlated");
        Ok(sessions)
    }

    /// LUIDs owning a live process, with the OR of their owners' admin flags.
    fn live_logon_ids(&self) -> Result<HashMap<Luid, bool>, WardenError> {
        let owners = self.owners.process_owners().map_err(|e| match e {
            WardenError::DependencyUnavailable { .. } => e,
            other => WardenError::DependencyUnavailable {
                message: other.to_string(),
            },
        })?;
        let mut live: HashMap<Luid, bool> = HashMap::with_capacity(owners.len());
        for owner in owners.values() {
            *live.entry(owner.logon_id).or_insert(false) |= owner.is_admin;
        }
        Ok(live)
    }

    fn is_excluded_domain(&self, domain: &str) -> bool {
        self.cfg
            .excluded_domains
            .iter()
            .any(|excluded| eq_ignore_case(excluded, domain))
    }

    fn admin_check(
        &self,
        scope: &'static str,
        username: &str,
        result: Result<bool, WardenError>,
    ) -> bool {
        match result {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::warn!(scope, username, error = %e, "admin check failed, treating as non-admin");
                false
            }
        }
    }
}
