//! In-memory layouts of the native records handed back by the Net* and LSA
//! listing calls. Field order and widths follow the platform headers so a
//! listing buffer can be walked with these types directly.

use std::ffi::c_void;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::wide;

/// Marker for types that describe one fixed-stride slot of a native listing.
pub trait NativeRecord: Sized {}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Luid {
    pub low_part: u32,
    pub high_part: i32,
}

impl Luid {
    pub const fn new(low_part: u32, high_part: i32) -> Self {
        Self {
            low_part,
            high_part,
        }
    }
}

impl From<u64> for Luid {
    #[allow(clippy::cast_possible_truncation)]
    fn from(value: u64) -> Self {
        Self {
            low_part: value as u32,
            high_part: ((value >> 32) as u32).cast_signed(),
        }
    }
}

/// Lower-case hex of the high part followed by the low part, no separator
/// and no padding. Both halves render their raw bits, so a negative
/// `high_part` shows as its two's-complement word (`ffffffff...`).
impl fmt::Display for Luid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}{:x}", self.high_part, self.low_part)
    }
}

impl NativeRecord for Luid {}

/// `LSA_UNICODE_STRING`: `length` counts bytes, not code units, and the
/// buffer is not guaranteed to be terminated.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UnicodeString {
    pub length: u16,
    pub maximum_length: u16,
    pub buffer: *mut u16,
}

impl UnicodeString {
    /// # Safety
    ///
    /// `buffer` must be null or valid for `length` bytes.
    #[allow(unsafe_code)]
    pub unsafe fn to_string_lossy(&self) -> String {
        unsafe { wide::string_from_counted(self.buffer, usize::from(self.length) / 2) }
    }
}

impl Default for UnicodeString {
    fn default() -> Self {
        Self {
            length: 0,
            maximum_length: 0,
            buffer: std::ptr::null_mut(),
        }
    }
}

/// `FILE_INFO_3`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FileInfo3 {
    pub id: u32,
    pub permissions: u32,
    pub num_locks: u32,
    pub pathname: *mut u16,
    pub username: *mut u16,
}

impl NativeRecord for FileInfo3 {}

/// `SHARE_INFO_2`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShareInfo2 {
    pub netname: *mut u16,
    pub share_type: u32,
    pub remark: *mut u16,
    pub permissions: u32,
    pub max_uses: u32,
    pub current_uses: u32,
    pub path: *mut u16,
    pub passwd: *mut u16,
}

impl NativeRecord for ShareInfo2 {}

/// `SESSION_INFO_2`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo2 {
    pub cname: *mut u16,
    pub username: *mut u16,
    pub num_opens: u32,
    pub time: u32,
    pub idle_time: u32,
    pub user_flags: u32,
    pub cltype_name: *mut u16,
}

impl NativeRecord for SessionInfo2 {}

/// `LOCALGROUP_USERS_INFO_0` and `GROUP_USERS_INFO_0` share this shape.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GroupNameInfo0 {
    pub name: *mut u16,
}

impl NativeRecord for GroupNameInfo0 {}

/// Leading fields of `SECURITY_LOGON_SESSION_DATA`. The native record is
/// longer; only this prefix is ever read.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SecurityLogonSessionData {
    pub size: u32,
    pub logon_id: Luid,
    pub user_name: UnicodeString,
    pub logon_domain: UnicodeString,
    pub authentication_package: UnicodeString,
    pub logon_type: u32,
    pub session: u32,
    pub sid: *mut c_void,
    pub logon_time: u64,
    pub logon_server: UnicodeString,
    pub dns_domain_name: UnicodeString,
    pub upn: UnicodeString,
}

impl NativeRecord for SecurityLogonSessionData {}
