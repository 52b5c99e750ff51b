//! Console Streams
//!
//! Keyboard/serial input for `read(0, ...)` and the console output buffer
//! for `write(1, ...)`.
//!
//! Callers hold the global file lock, so one `put_bytes` call lands on the
//! console without interleaving from another writer.

/// The system console.
pub trait Console {
    /// Block until a key is available and return it.
    fn get_byte(&self) -> u8;

    /// Emit `bytes` in order.
    fn put_bytes(&self, bytes: &[u8]);
}
