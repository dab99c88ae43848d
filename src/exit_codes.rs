//! Exit code constants for the davlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, unknown path)
//! - 2: Lock refused (the storage did not grant or release the lock)
//! - 3: Storage failure (lock store unreadable or unwritable)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config or state.
pub const USER_ERROR: i32 = 1;

/// The storage answered "no" to a lock or unlock request.
pub const LOCK_REFUSED: i32 = 2;

/// The lock store could not be read or written.
pub const STORAGE_FAILURE: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, LOCK_REFUSED, STORAGE_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
