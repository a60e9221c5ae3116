//! Reparse point probe built on Win32

use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_INSUFFICIENT_BUFFER, ERROR_MORE_DATA, HANDLE,
    INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FindClose, FindFirstFileW, FILE_ATTRIBUTE_REPARSE_POINT,
    FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT, FILE_SHARE_DELETE, FILE_SHARE_READ,
    FILE_SHARE_WRITE, OPEN_EXISTING, WIN32_FIND_DATAW,
};
use windows_sys::Win32::System::IO::DeviceIoControl;

use super::reparse::{self, ReparseRead};
use super::windows_path;
use super::SymlinkProbe;
use crate::core::constants::reparse::{FSCTL_GET_REPARSE_POINT, IO_REPARSE_TAG_SYMLINK};
use crate::core::errors::LinkError;

/// Probe for NTFS/ReFS reparse points
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsProbe;

fn os_str_to_wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(std::iter::once(0)).collect()
}

fn last_os_error() -> io::Error {
    io::Error::from_raw_os_error(unsafe { GetLastError() } as i32)
}

/// Closes the wrapped handle on drop
struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

/// Open the link itself, never its target; directories are permitted
fn open_reparse_point(path: &Path) -> Result<OwnedHandle, LinkError> {
    let wide = os_str_to_wide(path.as_os_str());
    let handle = unsafe {
        CreateFileW(
            wide.as_ptr(),
            0,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            std::ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_OPEN_REPARSE_POINT | FILE_FLAG_BACKUP_SEMANTICS,
            0,
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(LinkError::os(path, last_os_error()));
    }
    Ok(OwnedHandle(handle))
}

/// Issue `FSCTL_GET_REPARSE_POINT`, growing the buffer until the payload fits
fn read_reparse_payload(path: &Path, handle: &OwnedHandle) -> Result<reparse::SymlinkPayload, LinkError> {
    let mut capacity = reparse::initial_buffer_len();

    loop {
        let mut buffer = vec![0u8; capacity];
        let mut returned: u32 = 0;
        let ok = unsafe {
            DeviceIoControl(
                handle.0,
                FSCTL_GET_REPARSE_POINT,
                std::ptr::null(),
                0,
                buffer.as_mut_ptr().cast(),
                capacity as u32,
                &mut returned,
                std::ptr::null_mut(),
            )
        };

        let call_succeeded = if ok != 0 {
            true
        } else {
            let code = unsafe { GetLastError() };
            if code != ERROR_INSUFFICIENT_BUFFER && code != ERROR_MORE_DATA {
                return Err(LinkError::os(path, io::Error::from_raw_os_error(code as i32)));
            }
            false
        };

        let filled = &buffer[..(returned as usize).min(capacity)];
        match reparse::decode(path, filled, capacity, call_succeeded)? {
            ReparseRead::Complete(payload) => return Ok(payload),
            ReparseRead::Grow(next) => capacity = next.max(capacity + 1),
        }
    }
}

impl SymlinkProbe for WindowsProbe {
    fn is_symlink(&self, path: &Path) -> bool {
        let wide = os_str_to_wide(path.as_os_str());
        let mut find_data: WIN32_FIND_DATAW = unsafe { std::mem::zeroed() };
        let handle = unsafe { FindFirstFileW(wide.as_ptr(), &mut find_data) };
        if handle == INVALID_HANDLE_VALUE {
            return false;
        }
        unsafe {
            FindClose(handle);
        }

        // dwReserved0 carries the reparse tag when the attribute bit is set
        find_data.dwFileAttributes & FILE_ATTRIBUTE_REPARSE_POINT != 0
            && find_data.dwReserved0 == IO_REPARSE_TAG_SYMLINK
    }

    fn read_immediate_target(&self, path: &Path) -> Result<PathBuf, LinkError> {
        if !self.is_symlink(path) {
            return Err(LinkError::NotALink {
                path: path.to_path_buf(),
            });
        }

        let handle = open_reparse_point(path)?;
        let payload = read_reparse_payload(path, &handle)?;
        drop(handle);

        let target = if payload.relative {
            windows_path::resolve_relative_target(&path.to_string_lossy(), &payload.substitute_name)
        } else {
            windows_path::to_win32_namespace(&payload.substitute_name)
        };
        Ok(PathBuf::from(target))
    }

    fn name(&self) -> &'static str {
        "windows"
    }
}
