//! Syscall Trap Entry
//!
//! The `int $0x30` entry stub saves the user registers into a [`TrapFrame`]
//! and calls [`Kernel::handle_syscall`] with the trapping process's address
//! space.
//!
//! # User Stack at Trap Time
//! ```text
//! esp + 12 ┌──────────────┐
//!          │ argument 2   │
//! esp + 8  ├──────────────┤
//!          │ argument 1   │
//! esp + 4  ├──────────────┤
//!          │ argument 0   │
//! esp      ├──────────────┤
//!          │ syscall nr   │
//!          └──────────────┘
//! ```
//!
//! # Security Considerations
//! - The number's address is validated before it is dereferenced
//! - The number must be in the known range before it is used as an index
//! - All three argument words are validated and copied before any handler
//!   runs, whatever the syscall's arity
//! - Any failure above terminates the process with status -1 with no other
//!   side effect

use core::fmt;

use log::{info, warn};
use static_assertions::const_assert_eq;

use crate::config::WORD_SIZE;
use crate::drivers::Console;
use crate::fs::{FileSystem, OpenFile};
use crate::kernel::Kernel;
use crate::mm::{UserAccessError, UserMemory, VirtAddr};
use crate::proc::{ProcessControl, SleepLock};
use crate::syscall::handler::{Terminate, FAILURE};
use crate::syscall::numbers;
use crate::syscall::table::{RawArgs, SyscallFlags};
use crate::syscall::validate::read_user_word;

/// Exit status of a process killed by the kernel.
pub const KILLED: i32 = -1;

/// Register state saved by the interrupt entry stub.
///
/// Layout matches the push order of the stub and must not change.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapFrame {
    // Pushed by `pushal`.
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Ignored by `popal`.
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    /// Syscall return value.
    pub eax: u32,

    // Segment registers, pushed as 32-bit slots.
    pub gs: u16,
    _gs_pad: u16,
    pub fs: u16,
    _fs_pad: u16,
    pub es: u16,
    _es_pad: u16,
    pub ds: u16,
    _ds_pad: u16,

    /// Interrupt vector number.
    pub vec_no: u32,
    /// Error code (0 for software interrupts).
    pub error_code: u32,
    /// Saved `ebp` for backtraces.
    pub frame_pointer: u32,

    // Pushed by the CPU.
    pub eip: u32,
    pub cs: u16,
    _cs_pad: u16,
    pub eflags: u32,
    /// User stack pointer at the time of the trap.
    pub esp: u32,
    pub ss: u16,
    _ss_pad: u16,
}

const_assert_eq!(core::mem::size_of::<TrapFrame>(), 80);

impl TrapFrame {
    /// A frame for a syscall raised with the user stack at `esp`.
    pub fn syscall(esp: u32) -> Self {
        Self {
            vec_no: crate::config::SYSCALL_VECTOR as u32,
            esp,
            ..Self::default()
        }
    }

    /// The value the syscall returns to user mode.
    #[inline]
    pub fn return_value(&self) -> i32 {
        self.eax as i32
    }

    /// Store a syscall's return value.
    #[inline]
    pub fn set_return(&mut self, value: i32) {
        self.eax = value as u32;
    }
}

/// What the entry stub does after the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Return to user mode with `eax` set.
    Resume,
    /// The process was terminated with this status; do not resume.
    Exited(i32),
    /// The machine is powering off.
    Halted,
}

/// Why a trap was rejected before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapError {
    /// The stack pointer or an argument word is not a mapped user address.
    BadStack(UserAccessError),
    /// The syscall number is outside the known range.
    UnknownSyscall(u32),
}

impl From<UserAccessError> for TrapError {
    fn from(err: UserAccessError) -> Self {
        TrapError::BadStack(err)
    }
}

impl fmt::Display for TrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadStack(err) => write!(f, "bad syscall stack: {}", err),
            Self::UnknownSyscall(nr) => write!(f, "syscall number {} out of range", nr),
        }
    }
}

/// Validate the stack and fetch the syscall number and argument words.
///
/// Nothing is dereferenced before it has been validated.
pub fn fetch_syscall(mem: &impl UserMemory, esp: VirtAddr) -> Result<(u32, RawArgs), TrapError> {
    let nr = read_user_word(mem, esp)?;
    if !numbers::is_known(nr) {
        return Err(TrapError::UnknownSyscall(nr));
    }

    let mut args: RawArgs = [0; 3];
    let mut slot = esp;
    for arg in args.iter_mut() {
        slot = slot
            .checked_add(WORD_SIZE)
            .ok_or(UserAccessError::Fault(slot))?;
        *arg = read_user_word(mem, slot)?;
    }

    Ok((nr, args))
}

impl<F, P, C, L> Kernel<F, P, C, L>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    L: SleepLock,
{
    /// Handle a syscall trap from the current process.
    ///
    /// `mem` is the address space of the process that trapped.
    pub fn handle_syscall<M: UserMemory>(&self, mem: &mut M, frame: &mut TrapFrame) -> TrapOutcome {
        let (nr, args) = match fetch_syscall(mem, VirtAddr::new(frame.esp)) {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!("[SYSCALL] pid {}: {}", self.procs.current(), err);
                return self.exit_process(KILLED);
            }
        };

        let Some(entry) = self.table.lookup(nr) else {
            warn!(
                "[SYSCALL] pid {}: {} ({}) not implemented",
                self.procs.current(),
                numbers::name(nr),
                nr
            );
            frame.set_return(FAILURE);
            return TrapOutcome::Resume;
        };

        let call = (entry.decode)(args);
        #[cfg(feature = "syscall_debug")]
        log::trace!("[SYSCALL] pid {} {:?}", self.procs.current(), call);

        let result = {
            let _guard = entry
                .flags
                .contains(SyscallFlags::FILE_IO)
                .then(|| self.lock_files());
            self.execute(mem, call)
        };

        match result {
            Ok(value) => {
                frame.set_return(value);
                TrapOutcome::Resume
            }
            Err(Terminate::Exit(status)) => self.exit_process(status),
            Err(Terminate::Fault(err)) => {
                warn!(
                    "[SYSCALL] pid {}: {} in {}",
                    self.procs.current(),
                    err,
                    entry.name
                );
                self.exit_process(KILLED)
            }
            Err(Terminate::Halt) => {
                info!("[SYSCALL] halt requested by pid {}", self.procs.current());
                self.procs.power_off();
                TrapOutcome::Halted
            }
        }
    }

    /// Terminate the current process with `status`.
    ///
    /// Closes every file the process still holds, then hands it to the
    /// runtime. Also used by the fault handlers to kill a process.
    pub fn exit_process(&self, status: i32) -> TrapOutcome {
        let pid = self.procs.current();
        for (_, file) in self.files.release_all(pid) {
            file.close();
        }
        info!("[PROCESS] pid {} exited with status {}", pid, status);
        self.procs.exit(status);
        TrapOutcome::Exited(status)
    }
}
