//! The User-Program Layer
//!
//! [`Kernel`] owns the handle registry and the global file lock, and holds
//! the collaborators the syscall handlers call into. The kernel's
//! process-management code creates one at boot and passes it to the trap
//! entry stub; nothing in this crate is reached through ambient globals
//! except the read-only dispatch table.

use crate::drivers::Console;
use crate::fs::{FileSystem, FileTable};
use crate::proc::{ProcessControl, SleepLock};
use crate::syscall::{self, SyscallTable};

/// Syscall state and collaborators.
pub struct Kernel<F: FileSystem, P, C, L> {
    pub(crate) fs: F,
    pub(crate) procs: P,
    pub(crate) console: C,
    /// Open files of every process.
    pub(crate) files: FileTable<F::File>,
    /// Serializes read, write and exec. File-system internals are not
    /// reentrant.
    pub(crate) file_lock: L,
    pub(crate) table: &'static SyscallTable,
}

/// Holds the file-operation lock until dropped.
pub(crate) struct FileLockGuard<'a, L: SleepLock> {
    lock: &'a L,
}

impl<L: SleepLock> Drop for FileLockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl<F, P, C, L> Kernel<F, P, C, L>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    L: SleepLock,
{
    /// Set up the syscall layer. Builds the dispatch table on first use.
    ///
    /// `file_lock` must start out released.
    pub fn new(fs: F, procs: P, console: C, file_lock: L) -> Self {
        Self {
            fs,
            procs,
            console,
            files: FileTable::new(),
            file_lock,
            table: syscall::init(),
        }
    }

    /// Take the global file-operation lock.
    pub(crate) fn lock_files(&self) -> FileLockGuard<'_, L> {
        self.file_lock.acquire();
        FileLockGuard {
            lock: &self.file_lock,
        }
    }

    /// The handle registry.
    pub fn files(&self) -> &FileTable<F::File> {
        &self.files
    }

    /// The file system.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// The process runtime.
    pub fn procs(&self) -> &P {
        &self.procs
    }

    /// The console.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// The file-operation lock.
    pub fn file_lock(&self) -> &L {
        &self.file_lock
    }
}
