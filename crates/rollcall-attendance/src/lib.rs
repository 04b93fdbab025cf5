//! Attendance engine: wall-clock parsing, derived statuses and the
//! check-in/check-out state machine.
//!
//! Everything here is pure. Callers own the collections and decide when
//! to persist them.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod status;

pub use error::AttendanceError;
pub use ledger::{AttendanceState, Ledger, Scan, classify};
