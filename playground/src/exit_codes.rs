//! Stable exit codes for playground CLI commands.

/// Command succeeded; for `run`, the snippet completed without throwing.
pub const OK: i32 = 0;
/// Invalid input: unreadable file, unknown pattern, bad config or catalog.
pub const INVALID: i32 = 1;
/// `playground run` executed the snippet and it failed.
pub const EXECUTION_FAILED: i32 = 2;
