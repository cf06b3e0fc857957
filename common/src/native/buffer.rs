use std::ptr::NonNull;

use super::layout::NativeRecord;
use super::records::Records;
use crate::error::WardenError;

/// `NERR_Success`
pub const NERR_SUCCESS: u32 = 0;
/// `MAX_PREFERRED_LENGTH`: ask the listing call for everything in one pass.
pub const MAX_PREFERRED_LENGTH: u32 = u32::MAX;

/// Hands an OS-allocated buffer back to the allocator that produced it.
pub trait BufferRelease {
    fn release(&self, base: NonNull<u8>);
}

/// The Net* listings this crate issues. Every variant requests the unbounded
/// preferred length and applies no server, base-path or resume filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetQuery<'a> {
    /// `NetFileEnum` level 3.
    Files,
    /// `NetShareEnum` level 2.
    Shares,
    /// `NetSessionEnum` level 2.
    Sessions,
    /// `NetUserGetLocalGroups` level 0, indirect membership included.
    UserLocalGroups { username: &'a str },
    /// `NetUserGetGroups` level 0 against `server`.
    UserGroups { server: &'a str, username: &'a str },
}

impl NetQuery<'_> {
    pub fn operation(&self) -> &'static str {
        match self {
            NetQuery::Files => "NetFileEnum",
            NetQuery::Shares => "NetShareEnum",
            NetQuery::Sessions => "NetSessionEnum",
            NetQuery::UserLocalGroups { .. } => "NetUserGetLocalGroups",
            NetQuery::UserGroups { .. } => "NetUserGetGroups",
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            NetQuery::Files => 3,
            NetQuery::Shares | NetQuery::Sessions => 2,
            NetQuery::UserLocalGroups { .. } | NetQuery::UserGroups { .. } => 0,
        }
    }
}

/// What a Net* listing call wrote to its out-parameters.
#[derive(Debug, Clone, Copy)]
pub struct RawListing {
    pub status: u32,
    pub base: *mut u8,
    pub entries_read: u32,
    pub entries_total: u32,
}

/// The Net* listing surface.
///
/// # Safety
///
/// When `query` returns `NERR_SUCCESS` with a non-null `base`, that buffer
/// must hold `entries_read` records of the layout documented on the
/// `NetQuery` variant, with every embedded string pointer valid, until it is
/// passed to `release`.
#[allow(unsafe_code)]
pub unsafe trait NetApi: BufferRelease {
    fn query(&self, query: &NetQuery<'_>) -> RawListing;
}

/// Scoped ownership of one OS-allocated buffer. Dropping it releases the
/// buffer through its owner exactly once, whichever way the caller leaves.
pub struct NativeBuffer<'a, R: BufferRelease + ?Sized> {
    owner: &'a R,
    op: &'static str,
    base: NonNull<u8>,
    entries_read: usize,
    entries_total: usize,
}

impl<'a, R: BufferRelease + ?Sized> NativeBuffer<'a, R> {
    /// Takes ownership of `base`. A null `base` means nothing was allocated
    /// and is reported as `NullResult`.
    ///
    /// # Safety
    ///
    /// `base` must have been allocated by `owner` and must not be released by
    /// anyone else.
    #[allow(unsafe_code, clippy::missing_errors_doc)]
    pub unsafe fn adopt(
        owner: &'a R,
        op: &'static str,
        base: *mut u8,
        entries_read: usize,
        entries_total: usize,
    ) -> Result<Self, WardenError> {
        let Some(base) = NonNull::new(base) else {
            return Err(WardenError::NullResult { op });
        };
        Ok(Self {
            owner,
            op,
            base,
            entries_read,
            entries_total,
        })
    }

    pub fn entries_read(&self) -> usize {
        self.entries_read
    }

    pub fn entries_total(&self) -> usize {
        self.entries_total
    }

    pub fn is_truncated(&self) -> bool {
        self.entries_read < self.entries_total
    }

    /// Views the buffer as `entries_read` records of `T`. The view borrows the
    /// guard, so it cannot outlive the release.
    ///
    /// # Errors
    ///
    /// `MalformedBuffer` when the base is not aligned for `T`; the records
    /// are never read through a bad reference.
    ///
    /// # Safety
    ///
    /// The buffer must actually hold `entries_read` records laid out as `T`.
    #[allow(unsafe_code)]
    pub unsafe fn records<T: NativeRecord>(&self) -> Result<Records<'_, T>, WardenError> {
        unsafe { Records::from_raw(self.base.as_ptr(), self.entries_read) }.ok_or(
            WardenError::MalformedBuffer {
                op: self.op,
                entries: self.entries_read,
            },
        )
    }
}

impl<R: BufferRelease + ?Sized> Drop for NativeBuffer<'_, R> {
    fn drop(&mut self) {
        self.owner.release(self.base);
    }
}

/// Issues `query` and adopts the resulting buffer. A failing status means no
/// buffer was allocated, so nothing is released.
#[allow(unsafe_code, clippy::missing_errors_doc)]
pub fn acquire_listing<'a, A: NetApi + ?Sized>(
    api: &'a A,
    query: &NetQuery<'_>,
) -> Result<NativeBuffer<'a, A>, WardenError> {
    let op = query.operation();
    let raw = api.query(query);
    if raw.status != NERR_SUCCESS {
        return Err(WardenError::EnumerationFailed {
            op,
            status: raw.status,
        });
    }
    let entries_read = usize::try_from(raw.entries_read).unwrap_or(usize::MAX);
    let entries_total = usize::try_from(raw.entries_total).unwrap_or(usize::MAX);
    // SAFETY: NetApi guarantees a successful non-null base came from `api`.
    unsafe { NativeBuffer::adopt(api, op, raw.base, entries_read, entries_total) }
}
