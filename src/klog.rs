//! Kernel Log
//!
//! Backend for the `log` facade: formatted records go into a fixed-size
//! ring buffer, oldest bytes dropped first. The buffer can be read back by
//! the console driver or a debugger.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

use crate::config::KLOG_CAPACITY;

/// A circular buffer for storing log messages.
pub struct LogBuffer {
    data: VecDeque<u8>,
    capacity: usize,
}

impl LogBuffer {
    /// Create an empty buffer that holds at most `capacity` bytes.
    pub const fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::new(),
            capacity,
        }
    }

    /// Append bytes, evicting the oldest when full.
    pub fn write(&mut self, buf: &[u8]) {
        if self.capacity == 0 {
            return;
        }
        for &b in buf {
            if self.data.len() == self.capacity {
                self.data.pop_front();
            }
            self.data.push_back(b);
        }
    }

    /// The buffered bytes as a pair of slices, oldest first.
    pub fn read(&self) -> (&[u8], &[u8]) {
        self.data.as_slices()
    }

    /// Copy out the buffered bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}

/// `log` backend writing into a [`LogBuffer`].
pub struct KernelLogger {
    buffer: Mutex<LogBuffer>,
}

impl KernelLogger {
    /// Create a logger with a `capacity`-byte buffer.
    pub const fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(LogBuffer::new(capacity)),
        }
    }

    /// Copy out everything currently buffered.
    pub fn snapshot(&self) -> Vec<u8> {
        self.buffer.lock().to_vec()
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut buffer = self.buffer.lock();
        let _ = writeln!(buffer, "[{:<5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger::new(KLOG_CAPACITY);

/// Error type for logger installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlogError {
    /// A logger was already installed.
    AlreadyInstalled,
}

impl fmt::Display for KlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInstalled => write!(f, "logger already installed"),
        }
    }
}

/// Install the kernel logger and set the maximum level.
///
/// Call once during boot, before the first syscall.
pub fn init(level: LevelFilter) -> Result<(), KlogError> {
    log::set_logger(&LOGGER).map_err(|_| KlogError::AlreadyInstalled)?;
    log::set_max_level(level);
    Ok(())
}

/// Copy out the kernel log.
pub fn snapshot() -> Vec<u8> {
    LOGGER.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_drops_oldest() {
        let mut buf = LogBuffer::new(8);
        buf.write(b"abcdef");
        buf.write(b"ghij");
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.to_vec(), b"cdefghij");
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut buf = LogBuffer::new(0);
        buf.write(b"abc");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_formatted_records() {
        let logger = KernelLogger::new(256);
        log::set_max_level(LevelFilter::Trace);
        logger.log(
            &Record::builder()
                .level(log::Level::Warn)
                .target("syscall")
                .args(format_args!("pid {} killed", 3))
                .build(),
        );
        let text = String::from_utf8(logger.snapshot()).unwrap();
        assert_eq!(text, "[WARN  syscall] pid 3 killed\n");
    }

    #[test]
    fn test_install_once() {
        let _ = init(LevelFilter::Trace);
        assert_eq!(init(LevelFilter::Trace), Err(KlogError::AlreadyInstalled));
        log::info!(target: "klog", "boot marker {}", 42);
        let text = String::from_utf8_lossy(&snapshot()).into_owned();
        assert!(text.contains("boot marker 42"));
    }
}
