//! File-System Contract and Handle Identifiers
//!
//! The file system itself lives elsewhere. This module names what the
//! syscall layer needs from it and defines [`Fid`], the small integer user
//! programs use to refer to an open file.
//!
//! # Reserved Identifiers
//! - 0: console input
//! - 1: console output
//!
//! Neither ever appears in the [`FileTable`].

pub mod table;

pub use table::{FileTable, FileTableError, Rejected};

use core::fmt;

/// A file identifier ("file descriptor") as seen by user programs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fid(i32);

impl Fid {
    /// Console input.
    pub const STDIN: Self = Self(0);

    /// Console output.
    pub const STDOUT: Self = Self(1);

    /// First identifier handed out by `open`.
    pub const FIRST: Self = Self(2);

    /// Wrap the raw value passed by user code.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw value returned to user code.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Is this one of the reserved console streams?
    #[inline]
    pub const fn is_console(self) -> bool {
        self.0 == Self::STDIN.0 || self.0 == Self::STDOUT.0
    }
}

impl fmt::Debug for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fid({})", self.0)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open file.
///
/// Positions and lengths are byte counts; files are never larger than the
/// 32-bit range user programs can address.
pub trait OpenFile {
    /// Read up to `buf.len()` bytes at the current position, advancing it.
    /// Returns the number of bytes read (0 at end of file).
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `buf` at the current position, advancing it. Returns the number
    /// of bytes written, which may be short if the file cannot grow.
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Move the position to `pos`. Seeking past the end is allowed.
    fn seek(&mut self, pos: u32);

    /// The current position.
    fn tell(&self) -> u32;

    /// The file's length in bytes.
    fn length(&self) -> u32;

    /// Close the file, releasing the underlying resource.
    fn close(self);
}

/// The file system.
///
/// Paths are the strings user programs passed, copied into the kernel.
pub trait FileSystem {
    /// The open-file type handed out by `open`.
    type File: OpenFile;

    /// Create a file of `initial_size` bytes. Fails if it already exists.
    fn create(&self, path: &str, initial_size: u32) -> bool;

    /// Open an existing file.
    fn open(&self, path: &str) -> Option<Self::File>;

    /// Remove a file. Open handles to it stay usable.
    fn remove(&self, path: &str) -> bool;
}
