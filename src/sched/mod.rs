//! Scheduler support code
//!
//! Only the fixed-point arithmetic used by the MLFQS load-average and
//! recent-CPU bookkeeping lives here; the scheduler itself is part of the
//! thread runtime.

pub mod fixed_point;

pub use fixed_point::Fixed;
