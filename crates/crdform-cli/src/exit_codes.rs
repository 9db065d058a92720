//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure, including cluster transport errors
pub const ERROR: i32 = 1;

/// Validation error - an object's `spec` does not match the resource schema
pub const VALIDATION_ERROR: i32 = 2;

/// Configuration error - offline provider, bad config or catalog, unknown type
pub const CONFIG_ERROR: i32 = 3;

/// The object does not exist on the cluster
pub const NOT_FOUND: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Server-side apply conflict with another field manager
pub const CONFLICT: i32 = 6;

/// A wait condition was not met in time
pub const TIMEOUT: i32 = 7;

/// Usage error - malformed IDs or input files (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
