//! In-memory collaborators for driving syscalls through the trap path.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex as StdMutex};

use spin::Mutex;

use crate::drivers::Console;
use crate::fs::{FileSystem, OpenFile};
use crate::kernel::Kernel;
use crate::mm::{UserWindow, VirtAddr};
use crate::proc::{Pid, ProcessControl, SleepLock};
use crate::syscall::numbers::*;
use crate::trap::{TrapFrame, TrapOutcome};

type Contents = Arc<Mutex<Vec<u8>>>;

/// A flat file system keyed by path.
#[derive(Default)]
pub struct MemFs {
    files: Mutex<BTreeMap<String, Contents>>,
    open_handles: Arc<AtomicUsize>,
}

impl MemFs {
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.files
            .lock()
            .insert(path.to_string(), Arc::new(Mutex::new(data.to_vec())));
        self
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).map(|data| data.lock().clone())
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

pub struct MemFile {
    data: Contents,
    pos: u32,
    open_handles: Arc<AtomicUsize>,
}

impl OpenFile for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let data = self.data.lock();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u32;
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        // Files do not grow.
        let mut data = self.data.lock();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        data[start..start + n].copy_from_slice(&buf[..n]);
        self.pos += n as u32;
        n
    }

    fn seek(&mut self, pos: u32) {
        self.pos = pos;
    }

    fn tell(&self) -> u32 {
        self.pos
    }

    fn length(&self) -> u32 {
        self.data.lock().len() as u32
    }

    fn close(self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn create(&self, path: &str, initial_size: u32) -> bool {
        let mut files = self.files.lock();
        if path.is_empty() || files.contains_key(path) {
            return false;
        }
        files.insert(
            path.to_string(),
            Arc::new(Mutex::new(vec![0; initial_size as usize])),
        );
        true
    }

    fn open(&self, path: &str) -> Option<MemFile> {
        let data = Arc::clone(self.files.lock().get(path)?);
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Some(MemFile {
            data,
            pos: 0,
            open_handles: Arc::clone(&self.open_handles),
        })
    }

    fn remove(&self, path: &str) -> bool {
        self.files.lock().remove(path).is_some()
    }
}

/// Records what the syscall layer asked of the process runtime.
pub struct FakeProcs {
    current: AtomicI32,
    next_pid: AtomicI32,
    pub spawned: Mutex<Vec<String>>,
    pub exits: Mutex<Vec<(Pid, i32)>>,
    pub children: Mutex<BTreeMap<Pid, i32>>,
    pub powered_off: AtomicBool,
}

impl Default for FakeProcs {
    fn default() -> Self {
        Self {
            current: AtomicI32::new(1),
            next_pid: AtomicI32::new(100),
            spawned: Mutex::new(Vec::new()),
            exits: Mutex::new(Vec::new()),
            children: Mutex::new(BTreeMap::new()),
            powered_off: AtomicBool::new(false),
        }
    }
}

impl FakeProcs {
    pub fn switch_to(&self, pid: Pid) {
        self.current.store(pid, Ordering::SeqCst);
    }
}

impl ProcessControl for FakeProcs {
    fn current(&self) -> Pid {
        self.current.load(Ordering::SeqCst)
    }

    fn spawn(&self, cmd_line: &str) -> Option<Pid> {
        if cmd_line.starts_with("no-such-program") {
            return None;
        }
        self.spawned.lock().push(cmd_line.to_string());
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.children.lock().insert(pid, 0);
        Some(pid)
    }

    fn wait(&self, pid: Pid) -> i32 {
        self.children.lock().remove(&pid).unwrap_or(-1)
    }

    fn exit(&self, status: i32) {
        self.exits.lock().push((self.current(), status));
    }

    fn power_off(&self) {
        self.powered_off.store(true, Ordering::SeqCst);
    }
}

/// A sleeping lock on std primitives that counts acquisitions.
#[derive(Default)]
pub struct TestLock {
    held: StdMutex<bool>,
    freed: Condvar,
    pub acquisitions: AtomicUsize,
}

impl TestLock {
    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap()
    }
}

impl SleepLock for Arc<TestLock> {
    fn acquire(&self) {
        let mut held = self.held.lock().unwrap();
        while *held {
            held = self.freed.wait(held).unwrap();
        }
        *held = true;
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        *self.held.lock().unwrap() = false;
        self.freed.notify_one();
    }
}

/// Console with scripted input and captured output.
#[derive(Default)]
pub struct FakeConsole {
    pub input: Mutex<VecDeque<u8>>,
    pub output: Mutex<Vec<u8>>,
    /// Number of `put_bytes` calls.
    pub put_calls: AtomicUsize,
    /// For each byte read, whether the file lock was held.
    pub input_under_lock: Mutex<Vec<bool>>,
    file_lock: Arc<TestLock>,
}

impl Console for FakeConsole {
    fn get_byte(&self) -> u8 {
        self.input_under_lock.lock().push(self.file_lock.is_held());
        self.input.lock().pop_front().unwrap_or(0)
    }

    fn put_bytes(&self, bytes: &[u8]) {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.output.lock().extend_from_slice(bytes);
    }
}

pub type TestKernel = Kernel<MemFs, FakeProcs, FakeConsole, Arc<TestLock>>;

pub fn kernel(fs: MemFs) -> TestKernel {
    let file_lock = Arc::new(TestLock::default());
    let console = FakeConsole {
        file_lock: Arc::clone(&file_lock),
        ..FakeConsole::default()
    };
    Kernel::new(fs, FakeProcs::default(), console, file_lock)
}

/// Start of the simulated user region.
pub const USER_START: u32 = 0x0804_8000;
/// Size of the simulated user region.
pub const USER_LEN: usize = 4 * 4096;
/// Where syscall arguments are laid out: the last word is at the top.
pub const STACK_TOP: u32 = USER_START + USER_LEN as u32;
/// Scratch area for strings and buffers.
pub const DATA: u32 = USER_START + 0x100;

/// A process image: flat user memory plus helpers to set up a trap.
pub struct UserImage {
    bytes: Vec<u8>,
}

impl UserImage {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; USER_LEN],
        }
    }

    fn offset(addr: u32) -> usize {
        (addr - USER_START) as usize
    }

    pub fn put(&mut self, addr: u32, data: &[u8]) {
        let at = Self::offset(addr);
        self.bytes[at..at + data.len()].copy_from_slice(data);
    }

    pub fn put_str(&mut self, addr: u32, s: &str) -> u32 {
        self.put(addr, s.as_bytes());
        self.put(addr + s.len() as u32, &[0]);
        addr
    }

    pub fn get(&self, addr: u32, len: usize) -> &[u8] {
        let at = Self::offset(addr);
        &self.bytes[at..at + len]
    }

    /// Lay out `nr` and three argument words at the top of the stack.
    pub fn push_call(&mut self, nr: u32, args: [u32; 3]) -> TrapFrame {
        let esp = STACK_TOP - 16;
        self.put_words(esp, &[nr, args[0], args[1], args[2]]);
        TrapFrame::syscall(esp)
    }

    pub fn put_words(&mut self, addr: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.put(addr + 4 * i as u32, &word.to_le_bytes());
        }
    }

    pub fn window(&mut self) -> UserWindow<'_> {
        UserWindow::from_slice(VirtAddr::new(USER_START), &mut self.bytes)
    }

    /// Raise syscall `nr` and return the outcome and `eax`.
    pub fn syscall(&mut self, kernel: &TestKernel, nr: u32, args: [u32; 3]) -> (TrapOutcome, i32) {
        let mut frame = self.push_call(nr, args);
        let outcome = kernel.handle_syscall(&mut self.window(), &mut frame);
        (outcome, frame.return_value())
    }

    /// Raise a syscall that is expected to return to user mode.
    pub fn call(&mut self, kernel: &TestKernel, nr: u32, args: [u32; 3]) -> i32 {
        let (outcome, value) = self.syscall(kernel, nr, args);
        assert_eq!(outcome, TrapOutcome::Resume, "{} did not return", name(nr));
        value
    }

    pub fn open(&mut self, kernel: &TestKernel, path: &str) -> i32 {
        let at = self.put_str(DATA, path);
        self.call(kernel, SYS_OPEN, [at, 0, 0])
    }
}
