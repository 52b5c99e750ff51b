//! System Call Handlers
//!
//! Implements the individual syscalls on top of the handle registry and the
//! collaborators held by [`Kernel`].
//!
//! # Security Considerations
//! - Pointer arguments are validated here, before first use
//! - Identifiers resolve only within the calling process
//! - Wrong-direction console streams and unknown identifiers return -1

use alloc::vec::Vec;
use core::str;

use log::{debug, warn};

use super::table::Syscall;
use super::validate::{read_user_str, validate_user_read, validate_user_write};
use crate::config::IO_CHUNK;
use crate::drivers::Console;
use crate::fs::{Fid, FileSystem, OpenFile, Rejected};
use crate::kernel::Kernel;
use crate::mm::{UserAccessError, UserMemory, VirtAddr};
use crate::proc::{Pid, ProcessControl, SleepLock, PID_ERROR};

/// Value returned to user mode for a failed call.
pub const FAILURE: i32 = -1;

/// Why a handler did not return to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminate {
    /// The process asked to exit with this status.
    Exit(i32),
    /// A user pointer failed validation; the process is killed with -1.
    Fault(UserAccessError),
    /// Power off the machine.
    Halt,
}

impl From<UserAccessError> for Terminate {
    fn from(err: UserAccessError) -> Self {
        Terminate::Fault(err)
    }
}

/// Result of one syscall: the value for the caller's `eax`, or termination.
pub type SyscallResult = Result<i32, Terminate>;

impl<F, P, C, L> Kernel<F, P, C, L>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    L: SleepLock,
{
    /// Run a decoded syscall for the current process.
    pub(crate) fn execute<M: UserMemory>(&self, mem: &mut M, call: Syscall) -> SyscallResult {
        match call {
            Syscall::Halt => Err(Terminate::Halt),
            Syscall::Exit { status } => Err(Terminate::Exit(status)),
            Syscall::Exec { cmd_line } => Ok(self.sys_exec(mem, cmd_line)),
            Syscall::Wait { pid } => Ok(self.sys_wait(pid)),
            Syscall::Create { path, initial_size } => self.sys_create(mem, path, initial_size),
            Syscall::Remove { path } => self.sys_remove(mem, path),
            Syscall::Open { path } => self.sys_open(mem, path),
            Syscall::Filesize { fid } => Ok(self.sys_filesize(fid)),
            Syscall::Read { fid, buffer, size } => self.sys_read(mem, fid, buffer, size),
            Syscall::Write { fid, buffer, size } => self.sys_write(mem, fid, buffer, size),
            Syscall::Seek { fid, position } => Ok(self.sys_seek(fid, position)),
            Syscall::Tell { fid } => Ok(self.sys_tell(fid)),
            Syscall::Close { fid } => Ok(self.sys_close(fid)),
        }
    }

    /// Start a new process.
    ///
    /// A null or unreadable command line is a -1 return, not a kill.
    fn sys_exec<M: UserMemory>(&self, mem: &M, cmd_line: VirtAddr) -> i32 {
        if cmd_line.is_null() {
            return PID_ERROR;
        }
        let bytes = match read_user_str(mem, cmd_line) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("[SYSCALL] exec: {}", err);
                return PID_ERROR;
            }
        };
        let Ok(cmd_line) = str::from_utf8(&bytes) else {
            return PID_ERROR;
        };
        self.procs.spawn(cmd_line).unwrap_or(PID_ERROR)
    }

    fn sys_wait(&self, pid: Pid) -> i32 {
        self.procs.wait(pid)
    }

    /// Create a file. A null path kills the caller.
    fn sys_create<M: UserMemory>(&self, mem: &M, path: VirtAddr, initial_size: u32) -> SyscallResult {
        let path = read_user_str(mem, path)?;
        let Ok(path) = str::from_utf8(&path) else {
            return Ok(0);
        };
        Ok(i32::from(self.fs.create(path, initial_size)))
    }

    /// Delete a file. A null path is `false`; a bad one kills the caller.
    fn sys_remove<M: UserMemory>(&self, mem: &M, path: VirtAddr) -> SyscallResult {
        if path.is_null() {
            return Ok(0);
        }
        let path = read_user_str(mem, path)?;
        let Ok(path) = str::from_utf8(&path) else {
            return Ok(0);
        };
        Ok(i32::from(self.fs.remove(path)))
    }

    /// Open a file and register it for the caller.
    fn sys_open<M: UserMemory>(&self, mem: &M, path: VirtAddr) -> SyscallResult {
        if path.is_null() {
            return Ok(FAILURE);
        }
        let path = read_user_str(mem, path)?;
        let Ok(path) = str::from_utf8(&path) else {
            return Ok(FAILURE);
        };

        let Some(file) = self.fs.open(path) else {
            return Ok(FAILURE);
        };

        let pid = self.procs.current();
        match self.files.register(pid, file) {
            Ok(fid) => Ok(fid.as_raw()),
            Err(Rejected { file, error }) => {
                warn!("[SYSCALL] open {:?} for pid {}: {}", path, pid, error);
                file.close();
                Ok(FAILURE)
            }
        }
    }

    fn sys_filesize(&self, fid: Fid) -> i32 {
        let pid = self.procs.current();
        self.files
            .with_file(pid, fid, |file| file.length() as i32)
            .unwrap_or(FAILURE)
    }

    /// Read into a user buffer. The caller holds the file lock.
    fn sys_read<M: UserMemory>(&self, mem: &mut M, fid: Fid, buffer: VirtAddr, size: u32) -> SyscallResult {
        if fid == Fid::STDOUT {
            return Ok(FAILURE);
        }

        let dst = validate_user_write(mem, buffer, size)?;

        if fid == Fid::STDIN {
            for offset in 0..dst.len() {
                let byte = self.console.get_byte();
                dst.copy_from(mem, offset, &[byte])?;
            }
            return Ok(size as i32);
        }

        let pid = self.procs.current();
        let read = self.files.with_file(pid, fid, |file| {
            let mut chunk = [0u8; IO_CHUNK];
            let mut done = 0;
            while done < dst.len() {
                let want = (dst.len() - done).min(IO_CHUNK);
                let got = file.read(&mut chunk[..want]);
                dst.copy_from(mem, done, &chunk[..got])?;
                done += got;
                if got < want {
                    break;
                }
            }
            Ok::<_, UserAccessError>(done)
        });

        match read {
            Some(done) => Ok(done? as i32),
            None => Ok(FAILURE),
        }
    }

    /// Write from a user buffer. The caller holds the file lock.
    fn sys_write<M: UserMemory>(&self, mem: &M, fid: Fid, buffer: VirtAddr, size: u32) -> SyscallResult {
        if fid == Fid::STDIN {
            return Ok(FAILURE);
        }

        let src = validate_user_read(mem, buffer, size)?;

        if fid == Fid::STDOUT {
            // The whole buffer goes out in one console call.
            let mut bytes = Vec::new();
            if bytes.try_reserve_exact(src.len()).is_err() {
                warn!("[SYSCALL] write: no memory for {} console bytes", src.len());
                return Ok(FAILURE);
            }
            bytes.resize(src.len(), 0);
            src.copy_to(mem, 0, &mut bytes)?;
            self.console.put_bytes(&bytes);
            return Ok(size as i32);
        }

        let pid = self.procs.current();
        let written = self.files.with_file(pid, fid, |file| {
            let mut chunk = [0u8; IO_CHUNK];
            let mut done = 0;
            while done < src.len() {
                let want = (src.len() - done).min(IO_CHUNK);
                src.copy_to(mem, done, &mut chunk[..want])?;
                let put = file.write(&chunk[..want]);
                done += put;
                if put < want {
                    break;
                }
            }
            Ok::<_, UserAccessError>(done)
        });

        match written {
            Some(done) => Ok(done? as i32),
            None => Ok(FAILURE),
        }
    }

    fn sys_seek(&self, fid: Fid, position: u32) -> i32 {
        let pid = self.procs.current();
        self.files
            .with_file(pid, fid, |file| file.seek(position))
            .map_or(FAILURE, |()| 0)
    }

    fn sys_tell(&self, fid: Fid) -> i32 {
        let pid = self.procs.current();
        self.files
            .with_file(pid, fid, |file| file.tell() as i32)
            .unwrap_or(FAILURE)
    }

    /// Close a file the caller owns. Always 0, even for unknown identifiers.
    fn sys_close(&self, fid: Fid) -> i32 {
        let pid = self.procs.current();
        if let Some(file) = self.files.release(pid, fid) {
            file.close();
        }
        0
    }
}
