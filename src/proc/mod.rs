//! Process and Thread Runtime Contract
//!
//! The user-program layer does not create, schedule or reap processes. It
//! relies on the runtime for the identity of the trapping process, for
//! spawning and waiting, and for tearing a process down. Blocking locks come
//! from the runtime too.

/// Process identifier (mapped 1:1 to the thread id of its main thread).
pub type Pid = i32;

/// Returned to user mode when a process could not be spawned or waited on.
pub const PID_ERROR: Pid = -1;

/// Process execution, waiting and thread lifecycle.
///
/// Blocking methods block only the calling thread and are not cancellable.
pub trait ProcessControl {
    /// The process that owns the running thread.
    fn current(&self) -> Pid;

    /// Start a new process from `cmd_line` (program name followed by
    /// arguments).
    ///
    /// Blocks until the child has loaded its executable. Returns `None` when
    /// the load fails.
    fn spawn(&self, cmd_line: &str) -> Option<Pid>;

    /// Block until child `pid` terminates and return its exit status.
    ///
    /// Returns -1 if `pid` is not a direct child of the caller, has already
    /// been waited for, or was killed by the kernel.
    fn wait(&self, pid: Pid) -> i32;

    /// Record `status` as the current process's exit status and terminate
    /// its thread.
    ///
    /// The process's file handles have already been released when this is
    /// called. Kernel implementations switch away and never come back; the
    /// trap path does not resume the frame either way.
    fn exit(&self, status: i32);

    /// Power the machine off.
    fn power_off(&self);
}

/// A lock that puts waiters to sleep, supplied by the thread runtime.
///
/// Guards file-system calls that may block on the disk or the keyboard, so
/// waiting must yield the CPU rather than spin. Not reentrant.
pub trait SleepLock {
    /// Block until the calling thread holds the lock.
    fn acquire(&self);

    /// Release the lock. The calling thread must hold it.
    fn release(&self);
}
