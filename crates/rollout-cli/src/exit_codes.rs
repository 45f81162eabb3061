//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - also a declined teardown and a readiness timeout
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Prerequisite error - a mandatory tool or login is missing
pub const PREREQUISITE_ERROR: i32 = 2;

/// Apply error - namespace or release could not be applied
pub const APPLY_ERROR: i32 = 3;

/// Removal error - teardown of an existing release or namespace failed
pub const REMOVAL_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
