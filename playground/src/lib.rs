//! Interactive design-pattern playground.
//!
//! Learners read about a pattern, edit its code template and run it. The
//! crate is split the same way the UI thinks about it:
//!
//! - **[`core`]**: Pure data and formatting (patterns, results, markdown).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting pieces (the JavaScript interpreter, the print
//!   channel, config files, the record store).
//!
//! [`executor`] runs one snippet with output captured, and [`session`] wraps
//! it in the editor's `Idle -> Running -> ShowingResult` state machine.

pub mod core;
pub mod executor;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
