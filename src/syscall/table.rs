//! System Call Dispatch Table
//!
//! Maps a syscall number to a decoder that turns the three raw argument
//! words into a typed [`Syscall`]. Each call keeps its real parameter list;
//! nothing is reinterpreted through a shared function-pointer type.
//!
//! The table is built once, before the first user process runs, and is
//! read-only afterwards.

use bitflags::bitflags;
use log::info;
use spin::Once;

use super::numbers::*;
use crate::config::{SYSCALL_DPL, SYSCALL_NAME, SYSCALL_VECTOR};
use crate::fs::Fid;
use crate::mm::VirtAddr;
use crate::proc::Pid;

/// A decoded system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit { status: i32 },
    Exec { cmd_line: VirtAddr },
    Wait { pid: Pid },
    Create { path: VirtAddr, initial_size: u32 },
    Remove { path: VirtAddr },
    Open { path: VirtAddr },
    Filesize { fid: Fid },
    Read { fid: Fid, buffer: VirtAddr, size: u32 },
    Write { fid: Fid, buffer: VirtAddr, size: u32 },
    Seek { fid: Fid, position: u32 },
    Tell { fid: Fid },
    Close { fid: Fid },
}

/// The raw argument words above the syscall number on the user stack.
pub type RawArgs = [u32; 3];

/// Decodes raw argument words for one syscall.
pub type Decoder = fn(RawArgs) -> Syscall;

bitflags! {
    /// Properties the dispatcher acts on before running a handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyscallFlags: u8 {
        /// Runs under the global file-operation lock.
        const FILE_IO = 1 << 0;
    }
}

/// One dispatch table slot.
#[derive(Debug, Clone, Copy)]
pub struct SyscallEntry {
    /// Name for logs.
    pub name: &'static str,
    /// Argument decoder.
    pub decode: Decoder,
    /// Dispatch properties.
    pub flags: SyscallFlags,
}

/// Fixed-size table indexed by syscall number.
#[derive(Debug)]
pub struct SyscallTable {
    entries: [Option<SyscallEntry>; SYSCALL_COUNT],
}

impl SyscallTable {
    /// Populate the table with every implemented syscall.
    fn build() -> Self {
        let mut table = Self {
            entries: [None; SYSCALL_COUNT],
        };

        table.install(SYS_HALT, SyscallFlags::empty(), |_| Syscall::Halt);
        table.install(SYS_EXIT, SyscallFlags::empty(), |a| Syscall::Exit {
            status: a[0] as i32,
        });
        // Spawning loads an executable through the file system.
        table.install(SYS_EXEC, SyscallFlags::FILE_IO, |a| Syscall::Exec {
            cmd_line: VirtAddr::new(a[0]),
        });
        table.install(SYS_WAIT, SyscallFlags::empty(), |a| Syscall::Wait {
            pid: a[0] as Pid,
        });
        table.install(SYS_CREATE, SyscallFlags::empty(), |a| Syscall::Create {
            path: VirtAddr::new(a[0]),
            initial_size: a[1],
        });
        table.install(SYS_REMOVE, SyscallFlags::empty(), |a| Syscall::Remove {
            path: VirtAddr::new(a[0]),
        });
        table.install(SYS_OPEN, SyscallFlags::empty(), |a| Syscall::Open {
            path: VirtAddr::new(a[0]),
        });
        table.install(SYS_FILESIZE, SyscallFlags::empty(), |a| Syscall::Filesize {
            fid: Fid::from_raw(a[0] as i32),
        });
        table.install(SYS_READ, SyscallFlags::FILE_IO, |a| Syscall::Read {
            fid: Fid::from_raw(a[0] as i32),
            buffer: VirtAddr::new(a[1]),
            size: a[2],
        });
        table.install(SYS_WRITE, SyscallFlags::FILE_IO, |a| Syscall::Write {
            fid: Fid::from_raw(a[0] as i32),
            buffer: VirtAddr::new(a[1]),
            size: a[2],
        });
        table.install(SYS_SEEK, SyscallFlags::empty(), |a| Syscall::Seek {
            fid: Fid::from_raw(a[0] as i32),
            position: a[1],
        });
        table.install(SYS_TELL, SyscallFlags::empty(), |a| Syscall::Tell {
            fid: Fid::from_raw(a[0] as i32),
        });
        table.install(SYS_CLOSE, SyscallFlags::empty(), |a| Syscall::Close {
            fid: Fid::from_raw(a[0] as i32),
        });

        table
    }

    fn install(&mut self, nr: u32, flags: SyscallFlags, decode: Decoder) {
        self.entries[nr as usize] = Some(SyscallEntry {
            name: name(nr),
            decode,
            flags,
        });
    }

    /// Look up the handler for `nr`.
    ///
    /// `None` for numbers outside the table and for known numbers with no
    /// handler installed.
    #[inline]
    pub fn lookup(&self, nr: u32) -> Option<&SyscallEntry> {
        self.entries.get(nr as usize)?.as_ref()
    }

    /// Number of installed handlers.
    pub fn installed(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}

static TABLE: Once<SyscallTable> = Once::new();

/// Build the dispatch table and report the trap gate it serves.
///
/// Idempotent; every caller gets the same table.
pub fn init() -> &'static SyscallTable {
    TABLE.call_once(|| {
        let table = SyscallTable::build();
        info!(
            "[SYSCALL] {} handlers for int {:#x} (dpl {}, \"{}\")",
            table.installed(),
            SYSCALL_VECTOR,
            SYSCALL_DPL,
            SYSCALL_NAME
        );
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(core::ptr::eq(init(), init()));
        assert_eq!(init().installed(), 13);
    }

    #[test]
    fn test_reserved_numbers_have_no_handler() {
        let table = init();
        for nr in SYS_MMAP..=SYS_INUMBER {
            assert!(is_known(nr));
            assert!(table.lookup(nr).is_none());
        }
        assert!(table.lookup(SYS_MAX + 1).is_none());
        assert!(table.lookup(u32::MAX).is_none());
    }

    #[test]
    fn test_decoders_keep_argument_types() {
        let table = init();
        let args: RawArgs = [(-7i32) as u32, 0x0804_8000, 64];

        let read = table.lookup(SYS_READ).unwrap();
        assert_eq!(
            (read.decode)(args),
            Syscall::Read {
                fid: Fid::from_raw(-7),
                buffer: VirtAddr::new(0x0804_8000),
                size: 64
            }
        );
        assert!(read.flags.contains(SyscallFlags::FILE_IO));

        let exit = table.lookup(SYS_EXIT).unwrap();
        assert_eq!((exit.decode)(args), Syscall::Exit { status: -7 });
        assert!(exit.flags.is_empty());
        assert_eq!(exit.name, "exit");
    }

    #[test]
    fn test_only_io_and_exec_take_the_file_lock() {
        let table = init();
        let locked: Vec<u32> = (SYS_MIN..=SYS_MAX)
            .filter(|&nr| {
                table
                    .lookup(nr)
                    .is_some_and(|e| e.flags.contains(SyscallFlags::FILE_IO))
            })
            .collect();
        assert_eq!(locked, [SYS_EXEC, SYS_READ, SYS_WRITE]);
    }
}
