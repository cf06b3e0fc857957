use std::ffi::c_void;
use std::ptr::NonNull;

use sysinfo::System;
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, LUID};
use windows_sys::Win32::NetworkManagement::NetManagement::{
    NetApiBufferFree, NetUserGetGroups, NetUserGetLocalGroups,
};
use windows_sys::Win32::Security::Authentication::Identity::{
    LsaEnumerateLogonSessions, LsaFreeReturnBuffer, LsaGetLogonSessionData,
    SECURITY_LOGON_SESSION_DATA,
};
use windows_sys::Win32::Security::{
    GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TOKEN_STATISTICS, TokenElevation,
    TokenStatistics,
};
use windows_sys::Win32::Storage::FileSystem::{NetFileEnum, NetSessionEnum, NetShareEnum};
use windows_sys::Win32::System::Threading::{
    OpenProcess, OpenProcessToken, PROCESS_QUERY_LIMITED_INFORMATION,
};

use crate::error::WardenError;
use crate::logon::{LsaApi, ProcessOwner, ProcessOwnerMap, ProcessOwners, RawLogonSessions};
use crate::native::wide::to_wide_nul;
use crate::native::{
    BufferRelease, Luid, MAX_PREFERRED_LENGTH, NetApi, NetQuery, RawListing,
};

/// `LG_INCLUDE_INDIRECT`
const LG_INCLUDE_INDIRECT: u32 = 0x0001;

/// netapi32 listings, freed with `NetApiBufferFree`.
pub struct SystemNetApi;

impl BufferRelease for SystemNetApi {
    #[allow(unsafe_code)]
    fn release(&self, base: NonNull<u8>) {
        unsafe {
            NetApiBufferFree(base.as_ptr().cast::<c_void>().cast_const());
        }
    }
}

#[allow(unsafe_code)]
unsafe impl NetApi for SystemNetApi {
    fn query(&self, query: &NetQuery<'_>) -> RawListing {
        let mut base: *mut u8 = std::ptr::null_mut();
        let mut entries_read: u32 = 0;
        let mut entries_total: u32 = 0;
        let level = query.level();

        let status = match *query {
            NetQuery::Files => {
                let mut resume: usize = 0;
                unsafe {
                    NetFileEnum(
                        std::ptr::null(),
                        std::ptr::null(),
                        std::ptr::null(),
                        level,
                        std::ptr::from_mut(&mut base),
                        MAX_PREFERRED_LENGTH,
                        std::ptr::from_mut(&mut entries_read),
                        std::ptr::from_mut(&mut entries_total),
                        std::ptr::from_mut(&mut resume),
                    )
                }
            }
            NetQuery::Shares => {
                let mut resume: u32 = 0;
                unsafe {
                    NetShareEnum(
                        std::ptr::null(),
                        level,
                        std::ptr::from_mut(&mut base),
                        MAX_PREFERRED_LENGTH,
                        std::ptr::from_mut(&mut entries_read),
                        std::ptr::from_mut(&mut entries_total),
                        std::ptr::from_mut(&mut resume),
                    )
                }
            }
            NetQuery::Sessions => {
                let mut resume: u32 = 0;
                unsafe {
                    NetSessionEnum(
                        std::ptr::null(),
                        std::ptr::null(),
                        std::ptr::null(),
                        level,
                        std::ptr::from_mut(&mut base),
                        MAX_PREFERRED_LENGTH,
                        std::ptr::from_mut(&mut entries_read),
                        std::ptr::from_mut(&mut entries_total),
                        std::ptr::from_mut(&mut resume),
                    )
                }
            }
            NetQuery::UserLocalGroups { username } => {
                let username = to_wide_nul(username);
                unsafe {
                    NetUserGetLocalGroups(
                        std::ptr::null(),
                        username.as_ptr(),
                        level,
                        LG_INCLUDE_INDIRECT,
                        std::ptr::from_mut(&mut base),
                        MAX_PREFERRED_LENGTH,
                        std::ptr::from_mut(&mut entries_read),
                        std::ptr::from_mut(&mut entries_total),
                    )
                }
            }
            NetQuery::UserGroups { server, username } => {
                let server = to_wide_nul(server);
                let username = to_wide_nul(username);
                unsafe {
                    NetUserGetGroups(
                        server.as_ptr(),
                        username.as_ptr(),
                        level,
                        std::ptr::from_mut(&mut base),
                        MAX_PREFERRED_LENGTH,
                        std::ptr::from_mut(&mut entries_read),
                        std::ptr::from_mut(&mut entries_total),
                    )
                }
            }
        };

        RawListing {
            status,
            base,
            entries_read,
            entries_total,
        }
    }
}

/// secur32 logon-session table, freed with `LsaFreeReturnBuffer`.
pub struct SystemLsa;

impl BufferRelease for SystemLsa {
    #[allow(unsafe_code)]
    fn release(&self, base: NonNull<u8>) {
        let status = unsafe { LsaFreeReturnBuffer(base.as_ptr().cast::<c_void>().cast_const()) };
        if status != 0 {
            tracing::warn!(status, "LsaFreeReturnBuffer failed");
        }
    }
}

#[allow(unsafe_code)]
unsafe impl LsaApi for SystemLsa {
    fn enumerate_logon_sessions(&self) -> RawLogonSessions {
        let mut count: u32 = 0;
        let mut list: *mut LUID = std::ptr::null_mut();
        let status = unsafe {
            LsaEnumerateLogonSessions(std::ptr::from_mut(&mut count), std::ptr::from_mut(&mut list))
        };
        RawLogonSessions {
            status,
            count,
            list: list.cast(),
        }
    }

    fn logon_session_data(&self, logon_id: &Luid) -> *mut u8 {
        let id = LUID {
            LowPart: logon_id.low_part,
            HighPart: logon_id.high_part,
        };
        let mut data: *mut SECURITY_LOGON_SESSION_DATA = std::ptr::null_mut();
        let status =
            unsafe { LsaGetLogonSessionData(std::ptr::from_ref(&id), std::ptr::from_mut(&mut data)) };
        if status != 0 {
            if !data.is_null() {
                unsafe {
                    LsaFreeReturnBuffer(data.cast::<c_void>().cast_const());
                }
            }
            return std::ptr::null_mut();
        }
        data.cast()
    }
}

struct HandleGuard(HANDLE);

impl Drop for HandleGuard {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

/// Live processes and the logon session each one runs under.
pub struct SystemProcessOwners;

impl ProcessOwners for SystemProcessOwners {
    fn process_owners(&self) -> Result<ProcessOwnerMap, WardenError> {
        let mut sys = System::new();
        sys.refresh_processes();

        let mut owners = ProcessOwnerMap::new();
        for pid in sys.processes().keys() {
            let pid = pid.as_u32();
            if let Some(owner) = process_owner(pid) {
                owners.insert(pid, owner);
            }
        }
        if owners.is_empty() {
            return Err(WardenError::DependencyUnavailable {
                message: format!(
                    "无法读取任何进程令牌（共 {} 个进程）",
                    sys.processes().len()
                ),
            });
        }
        tracing::debug!(processes = owners.len(), "process owners collected");
        Ok(owners)
    }
}

#[allow(unsafe_code)]
fn process_owner(pid: u32) -> Option<ProcessOwner> {
    let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
    if process == 0 {
        return None;
    }
    let process = HandleGuard(process);

    let mut token: HANDLE = 0;
    if unsafe { OpenProcessToken(process.0, TOKEN_QUERY, std::ptr::from_mut(&mut token)) } == 0 {
        return None;
    }
    let token = HandleGuard(token);

    let mut stats: TOKEN_STATISTICS = unsafe { std::mem::zeroed() };
    let mut returned: u32 = 0;
    let ok = unsafe {
        GetTokenInformation(
            token.0,
            TokenStatistics,
            std::ptr::from_mut(&mut stats).cast(),
            u32::try_from(std::mem::size_of::<TOKEN_STATISTICS>()).unwrap_or(u32::MAX),
            std::ptr::from_mut(&mut returned),
        )
    };
    if ok == 0 {
        return None;
    }

    let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
    let ok = unsafe {
        GetTokenInformation(
            token.0,
            TokenElevation,
            std::ptr::from_mut(&mut elevation).cast(),
            u32::try_from(std::mem::size_of::<TOKEN_ELEVATION>()).unwrap_or(u32::MAX),
            std::ptr::from_mut(&mut returned),
        )
    };

    Some(ProcessOwner {
        logon_id: Luid::new(stats.AuthenticationId.LowPart, stats.AuthenticationId.HighPart),
        is_admin: ok != 0 && elevation.TokenIsElevated != 0,
    })
}
