#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use super::buffer::{BufferRelease, NERR_SUCCESS, NetApi, NetQuery, RawListing};
use super::layout::{FileInfo3, GroupNameInfo0, SessionInfo2, ShareInfo2};
use super::wide::to_wide_nul;

enum Payload {
    Failing(u32),
    Null,
    Files(Vec<FileInfo3>),
    Shares(Vec<ShareInfo2>),
    Sessions(Vec<SessionInfo2>),
    Groups(Vec<GroupNameInfo0>),
    Misaligned(Vec<u64>, usize),
}

/// Synthetic Net* surface: every query answers with the same pre-built,
/// stride-aligned buffer and counts releases.
pub(crate) struct FakeNet {
    payload: Payload,
    strings: Vec<Vec<u16>>,
    total_override: Option<u32>,
    released: Cell<usize>,
    queries: RefCell<Vec<String>>,
}

impl FakeNet {
    fn new(payload: Payload) -> Self {
        Self {
            payload,
            strings: Vec::new(),
            total_override: None,
            released: Cell::new(0),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn wide(&mut self, s: &str) -> *mut u16 {
        let mut w = to_wide_nul(s);
        let ptr = w.as_mut_ptr();
        self.strings.push(w);
        ptr
    }

    pub(crate) fn failing(status: u32) -> Self {
        Self::new(Payload::Failing(status))
    }

    pub(crate) fn null() -> Self {
        Self::new(Payload::Null)
    }

    pub(crate) fn with_files(files: &[(u32, u32, u32, &str, &str)]) -> Self {
        let mut fake = Self::new(Payload::Null);
        let records: Vec<FileInfo3> = files
            .iter()
            .map(|&(id, permissions, num_locks, path, user)| FileInfo3 {
                id,
                permissions,
                num_locks,
                pathname: fake.wide(path),
                username: fake.wide(user),
            })
            .collect();
        fake.payload = Payload::Files(records);
        fake
    }

    pub(crate) fn with_shares(shares: &[(&str, u32, &str, &str)]) -> Self {
        let mut fake = Self::new(Payload::Null);
        let records: Vec<ShareInfo2> = shares
            .iter()
            .enumerate()
            .map(|(i, &(name, share_type, remark, path))| {
                let n = u32::try_from(i).unwrap_or(0);
                ShareInfo2 {
                    netname: fake.wide(name),
                    share_type,
                    remark: fake.wide(remark),
                    permissions: 0x3f,
                    max_uses: u32::MAX,
                    current_uses: n,
                    path: fake.wide(path),
                    passwd: std::ptr::null_mut(),
                }
            })
            .collect();
        fake.payload = Payload::Shares(records);
        fake
    }

    pub(crate) fn with_sessions(sessions: &[(&str, &str, u32, u32)]) -> Self {
        let mut fake = Self::new(Payload::Null);
        let records: Vec<SessionInfo2> = sessions
            .iter()
            .map(|&(client, user, time, idle_time)| SessionInfo2 {
                cname: fake.wide(client),
                username: fake.wide(user),
                num_opens: 2,
                time,
                idle_time,
                user_flags: 0,
                cltype_name: std::ptr::null_mut(),
            })
            .collect();
        fake.payload = Payload::Sessions(records);
        fake
    }

    pub(crate) fn with_groups(groups: &[&str]) -> Self {
        let mut fake = Self::new(Payload::Null);
        let records: Vec<GroupNameInfo0> = groups
            .iter()
            .map(|g| GroupNameInfo0 { name: fake.wide(g) })
            .collect();
        fake.payload = Payload::Groups(records);
        fake
    }

    /// A successful listing of `entries` records whose base is one byte off.
    pub(crate) fn misaligned(entries: usize) -> Self {
        Self::new(Payload::Misaligned(vec![0u64; entries * 8 + 1], entries))
    }

    pub(crate) fn with_total(mut self, total: u32) -> Self {
        self.total_override = Some(total);
        self
    }

    pub(crate) fn released(&self) -> usize {
        self.released.get()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    fn base_and_len(&self) -> (*mut u8, usize) {
        match &self.payload {
            Payload::Failing(_) | Payload::Null => (std::ptr::null_mut(), 0),
            Payload::Files(v) => (v.as_ptr().cast_mut().cast(), v.len()),
            Payload::Shares(v) => (v.as_ptr().cast_mut().cast(), v.len()),
            Payload::Sessions(v) => (v.as_ptr().cast_mut().cast(), v.len()),
            Payload::Groups(v) => (v.as_ptr().cast_mut().cast(), v.len()),
            Payload::Misaligned(v, entries) => {
                // SAFETY: the backing vector is never empty, so one byte in stays inside it.
                (unsafe { v.as_ptr().cast::<u8>().add(1).cast_mut() }, *entries)
            }
        }
    }
}

impl BufferRelease for FakeNet {
    fn release(&self, base: NonNull<u8>) {
        assert_eq!(base.as_ptr(), self.base_and_len().0, "foreign buffer released");
        self.released.set(self.released.get() + 1);
    }
}

unsafe impl NetApi for FakeNet {
    fn query(&self, query: &NetQuery<'_>) -> RawListing {
        let rendered = match query {
            NetQuery::UserLocalGroups { username } => format!("{}({username})", query.operation()),
            NetQuery::UserGroups { server, username } => {
                format!("{}({server},{username})", query.operation())
            }
            other => other.operation().to_string(),
        };
        self.queries.borrow_mut().push(rendered);

        let status = match self.payload {
            Payload::Failing(status) => status,
            _ => NERR_SUCCESS,
        };
        let (base, len) = self.base_and_len();
        let read = u32::try_from(len).unwrap_or(u32::MAX);
        RawListing {
            status,
            base,
            entries_read: read,
            entries_total: self.total_override.unwrap_or(read),
        }
    }
}
