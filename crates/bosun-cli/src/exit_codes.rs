//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - manifest metadata check failed
pub const VALIDATION_ERROR: i32 = 2;

/// Render error - interpolation, merge or provision resolution failed
pub const RENDER_ERROR: i32 = 3;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Temporary failure - another operation holds the lock (sysexits.h EX_TEMPFAIL)
pub const LOCKED: i32 = 75;
