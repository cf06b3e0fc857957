//! Decoding of OS-allocated listing buffers: record layouts, the stride
//! walker, wide-string extraction and scoped buffer ownership.

pub mod buffer;
pub mod layout;
pub mod records;
pub mod wide;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{
    BufferRelease, MAX_PREFERRED_LENGTH, NERR_SUCCESS, NativeBuffer, NetApi, NetQuery, RawListing,
    acquire_listing,
};
pub use layout::{
    FileInfo3, GroupNameInfo0, Luid, NativeRecord, SecurityLogonSessionData, SessionInfo2,
    ShareInfo2, UnicodeString,
};
pub use records::Records;
