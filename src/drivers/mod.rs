//! Device contracts for the user-program layer
//!
//! The user-program layer only needs the console. Both streams are reached
//! through the reserved identifiers 0 (input) and 1 (output).

pub mod console;

pub use console::Console;
