use std::time::Duration;

use crate::config::EnumerationConfig;
use crate::error::WardenError;
use crate::native::wide::string_from_wide_ptr;
use crate::native::{
    FileInfo3, NativeRecord, NetApi, NetQuery, SessionInfo2, ShareInfo2, acquire_listing,
};
use crate::protocol::{NetworkFile, NetworkSession, NetworkShare, OpenFile, describe_share_type};

/// What a call site does when the listing succeeds but hands back no buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    Empty,
    Fail,
}

pub struct Enumerator<'a, A: NetApi + ?Sized> {
    api: &'a A,
    null_as_empty: bool,
}

impl<'a, A: NetApi + ?Sized> Enumerator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            null_as_empty: false,
        }
    }

    pub fn with_config(api: &'a A, cfg: &EnumerationConfig) -> Self {
        Self {
            api,
            null_as_empty: cfg.treat_null_as_empty,
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn open_files(&self) -> Result<Vec<OpenFile>, WardenError> {
        self.collect(NetQuery::Files, NullPolicy::Fail, |r: &FileInfo3| OpenFile {
            id: r.id,
            permissions: r.permissions,
            num_locks: r.num_locks,
            path: wide(r.pathname),
            username: wide(r.username),
        })
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn network_files(&self) -> Result<Vec<NetworkFile>, WardenError> {
        self.collect(NetQuery::Files, NullPolicy::Fail, |r: &FileInfo3| NetworkFile {
            id: r.id,
            permissions: r.permissions,
            num_locks: r.num_locks,
            path: wide(r.pathname),
            username: wide(r.username),
        })
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn network_shares(&self) -> Result<Vec<NetworkShare>, WardenError> {
        self.collect(NetQuery::Shares, NullPolicy::Fail, |r: &ShareInfo2| NetworkShare {
            name: wide(r.netname),
            share_type: describe_share_type(r.share_type),
            comment: wide(r.remark),
            permissions: r.permissions,
            max_uses: r.max_uses,
            current_uses: r.current_uses,
            path: wide(r.path),
        })
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn network_sessions(&self) -> Result<Vec<NetworkSession>, WardenError> {
        self.collect(NetQuery::Sessions, NullPolicy::Empty, |r: &SessionInfo2| {
            NetworkSession {
                client_name: wide(r.cname),
                username: wide(r.username),
                num_opens: r.num_opens,
                time: Duration::from_secs(u64::from(r.time)),
                idle_time: Duration::from_secs(u64::from(r.idle_time)),
                user_flags: r.user_flags,
                client_type: wide(r.cltype_name),
            }
        })
    }

    fn policy(&self, call_site: NullPolicy) -> NullPolicy {
        if self.null_as_empty {
            NullPolicy::Empty
        } else {
            call_site
        }
    }

    #[allow(unsafe_code)]
    fn collect<T, O>(
        &self,
        query: NetQuery<'_>,
        on_null: NullPolicy,
        decode: impl Fn(&T) -> O,
    ) -> Result<Vec<O>, WardenError>
    where
        T: NativeRecord,
    {
        let buffer = match acquire_listing(self.api, &query) {
            Ok(buffer) => buffer,
            Err(WardenError::NullResult { op }) if self.policy(on_null) == NullPolicy::Empty => {
                tracing::debug!(op, "listing returned no buffer");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        if buffer.is_truncated() {
            tracing::debug!(
                op = query.operation(),
                read = buffer.entries_read(),
                total = buffer.entries_total(),
                "partial listing"
            );
        }
        // SAFETY: each call site pairs the query with the layout of its level.
        let records = unsafe { buffer.records::<T>() }?;
        Ok(records.map(decode).collect())
    }
}

#[allow(unsafe_code)]
fn wide(ptr: *const u16) -> String {
    // SAFETY: only called on string fields of records still owned by a live NativeBuffer.
    unsafe { string_from_wide_ptr(ptr) }
}
