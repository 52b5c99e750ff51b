//! File-Handle Registry
//!
//! Every open file is registered twice: in the system-wide map from
//! identifier to handle, and in the private index of the process that opened
//! it. Both views live behind one lock so an entry is always in both or in
//! neither.
//!
//! # Design
//! - Identifiers come from one atomic counter shared by all processes,
//!   starting at 2 and never reused during a boot
//! - The registry lock is separate from the global file-operation lock and
//!   is never held while taking it
//! - The registry lock covers lookups only. Each file has its own lock, held
//!   while an operation runs on it, so I/O on one file never stalls opens,
//!   closes and lookups elsewhere
//! - Only the owning process can release an entry (close or exit cleanup)
//! - Allocation failure is reported, not fatal: the file is handed back to
//!   the caller to close

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicI32, Ordering};

use hashbrown::{HashMap, HashSet};
use log::debug;
use spin::Mutex;

use super::Fid;
use crate::proc::Pid;

/// Error type for registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTableError {
    /// No memory for the new entry.
    OutOfMemory,
    /// The identifier counter reached `i32::MAX`.
    IdentifiersExhausted,
}

impl fmt::Display for FileTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory for file handle"),
            Self::IdentifiersExhausted => write!(f, "file identifiers exhausted"),
        }
    }
}

/// A file the registry could not take, returned so the caller can close it.
#[derive(Debug)]
pub struct Rejected<F> {
    /// The file that was not registered.
    pub file: F,
    /// Why it was refused.
    pub error: FileTableError,
}

/// A registered file. `None` once the file has been released.
type Slot<F> = Arc<Mutex<Option<F>>>;

struct Handle<F> {
    owner: Pid,
    file: Slot<F>,
}

struct Tables<F> {
    /// System-wide view.
    global: HashMap<Fid, Handle<F>>,
    /// Per-process views.
    by_process: HashMap<Pid, HashSet<Fid>>,
}

impl<F> Tables<F> {
    /// Make room for one more entry owned by `owner` in both views.
    fn reserve(&mut self, owner: Pid) -> Result<(), FileTableError> {
        self.global
            .try_reserve(1)
            .map_err(|_| FileTableError::OutOfMemory)?;
        self.by_process
            .try_reserve(1)
            .map_err(|_| FileTableError::OutOfMemory)?;
        self.by_process
            .entry(owner)
            .or_default()
            .try_reserve(1)
            .map_err(|_| FileTableError::OutOfMemory)
    }
}

/// The registry of open files for all processes.
pub struct FileTable<F> {
    next_fid: AtomicI32,
    tables: Mutex<Tables<F>>,
}

impl<F> FileTable<F> {
    /// Create an empty registry whose first identifier is 2.
    pub fn new() -> Self {
        Self::starting_at(Fid::FIRST)
    }

    /// Create an empty registry that hands out identifiers from `first`.
    pub(crate) fn starting_at(first: Fid) -> Self {
        debug_assert!(first.as_raw() >= Fid::FIRST.as_raw());
        Self {
            next_fid: AtomicI32::new(first.as_raw()),
            tables: Mutex::new(Tables {
                global: HashMap::new(),
                by_process: HashMap::new(),
            }),
        }
    }

    /// Take the next identifier.
    ///
    /// Strictly increasing and never below 2. Safe to call from any thread
    /// without holding the registry lock.
    pub fn allocate_fid(&self) -> Result<Fid, FileTableError> {
        self.next_fid
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map(Fid::from_raw)
            .map_err(|_| FileTableError::IdentifiersExhausted)
    }

    /// Register `file` as opened by `owner` and return its new identifier.
    ///
    /// On failure nothing is linked and the file comes back in [`Rejected`].
    pub fn register(&self, owner: Pid, file: F) -> Result<Fid, Rejected<F>> {
        let mut tables = self.tables.lock();

        let fid = match tables.reserve(owner).and_then(|()| self.allocate_fid()) {
            Ok(fid) => fid,
            Err(error) => return Err(Rejected { file, error }),
        };

        tables.global.insert(
            fid,
            Handle {
                owner,
                file: Arc::new(Mutex::new(Some(file))),
            },
        );
        tables.by_process.entry(owner).or_default().insert(fid);

        debug!("[FILES] pid {} registered fid {}", owner, fid);
        Ok(fid)
    }

    /// Which process owns `fid`, if any process does.
    pub fn owner_of(&self, fid: Fid) -> Option<Pid> {
        self.tables.lock().global.get(&fid).map(|handle| handle.owner)
    }

    /// Does `owner` hold `fid`?
    pub fn is_owned_by(&self, owner: Pid, fid: Fid) -> bool {
        self.tables
            .lock()
            .by_process
            .get(&owner)
            .is_some_and(|fids| fids.contains(&fid))
    }

    /// Run `op` on the file `owner` holds as `fid`.
    ///
    /// Returns `None` for unknown identifiers, for identifiers that belong
    /// to another process, and for files released before `op` got to run.
    /// Only the file's own lock is held while `op` runs.
    pub fn with_file<R>(&self, owner: Pid, fid: Fid, op: impl FnOnce(&mut F) -> R) -> Option<R> {
        let slot = {
            let tables = self.tables.lock();
            if !tables
                .by_process
                .get(&owner)
                .is_some_and(|fids| fids.contains(&fid))
            {
                return None;
            }
            let handle = tables.global.get(&fid)?;
            debug_assert_eq!(handle.owner, owner);
            Arc::clone(&handle.file)
        };

        let mut file = slot.lock();
        file.as_mut().map(op)
    }

    /// Unlink `fid` from both views and hand back the file.
    ///
    /// Returns `None`, and changes nothing, if `owner` does not hold `fid`.
    /// Waits for an operation already running on the file to finish. The
    /// caller closes the returned file.
    pub fn release(&self, owner: Pid, fid: Fid) -> Option<F> {
        let slot = {
            let mut tables = self.tables.lock();

            let fids = tables.by_process.get_mut(&owner)?;
            if !fids.remove(&fid) {
                return None;
            }
            if fids.is_empty() {
                tables.by_process.remove(&owner);
            }

            tables.global.remove(&fid)?.file
        };

        debug!("[FILES] pid {} released fid {}", owner, fid);
        let file = slot.lock().take();
        file
    }

    /// Unlink every entry `owner` holds, for exit cleanup.
    ///
    /// The files come back in no particular order; the caller closes them.
    pub fn release_all(&self, owner: Pid) -> Vec<(Fid, F)> {
        let slots: Vec<(Fid, Slot<F>)> = {
            let mut tables = self.tables.lock();

            let Some(fids) = tables.by_process.remove(&owner) else {
                return Vec::new();
            };

            fids.into_iter()
                .filter_map(|fid| Some((fid, tables.global.remove(&fid)?.file)))
                .collect()
        };

        let files: Vec<(Fid, F)> = slots
            .into_iter()
            .filter_map(|(fid, slot)| {
                let file = slot.lock().take()?;
                Some((fid, file))
            })
            .collect();

        debug!("[FILES] pid {} released {} fids on exit", owner, files.len());
        files
    }

    /// Identifiers `owner` holds, in ascending order.
    pub fn fids_of(&self, owner: Pid) -> Vec<Fid> {
        let tables = self.tables.lock();
        let mut fids: Vec<Fid> = tables
            .by_process
            .get(&owner)
            .map(|fids| fids.iter().copied().collect())
            .unwrap_or_default();
        fids.sort_unstable();
        fids
    }

    /// Number of open files across all processes.
    pub fn len(&self) -> usize {
        self.tables.lock().global.len()
    }

    /// Is nothing open?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<F> Default for FileTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for FileTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.lock();
        f.debug_struct("FileTable")
            .field("next_fid", &self.next_fid.load(Ordering::Relaxed))
            .field("open", &tables.global.len())
            .field("processes", &tables.by_process.len())
            .finish()
    }
}
