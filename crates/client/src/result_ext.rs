//! Logging helpers for `Result` and `Option`.
//!
//! Failures that the client deliberately swallows (storage writes, cache
//! bookkeeping) still need a trace; these helpers record the caller location
//! alongside the context message.

use std::fmt::Display;

/// Extension trait for logging errors with context.
pub trait ResultExt<T, E> {
    /// Log the error at `error` level if this is an `Err`, returning `self` unchanged.
    fn log<S: ToString>(self, context: S) -> Result<T, E>;

    /// Log the error at `warn` level and discard it.
    ///
    /// Used where a failure degrades behavior but must not reach the caller.
    fn warn_ok<S: ToString>(self, context: S) -> Option<T>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            tracing::error!(
                target: "voxmail_client",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }

    #[track_caller]
    fn warn_ok<S: ToString>(self, context: S) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                let caller_location = std::panic::Location::caller();
                tracing::warn!(
                    target: "voxmail_client",
                    error = %e,
                    file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                    context = %context.to_string(),
                    "Operation degraded"
                );
                None
            }
        }
    }
}

/// Extension trait for logging a missing value.
pub trait OptionResultExt<T> {
    fn log_none<S: ToString>(self, context: S) -> Option<T>;
}

impl<T> OptionResultExt<T> for Option<T> {
    #[track_caller]
    fn log_none<S: ToString>(self, context: S) -> Option<T> {
        if self.is_none() {
            let caller_location = std::panic::Location::caller();
            tracing::debug!(
                target: "voxmail_client",
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Expected value was None"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_passes_through() {
        let ok: Result<i32, &str> = Ok(7);
        assert_eq!(ok.log("ctx").unwrap(), 7);

        let err: Result<i32, &str> = Err("boom");
        assert_eq!(err.log("ctx").unwrap_err(), "boom");
    }

    #[test]
    fn test_warn_ok_discards_error() {
        let err: Result<i32, &str> = Err("disk full");
        assert_eq!(err.warn_ok("persist session"), None);

        let ok: Result<i32, &str> = Ok(1);
        assert_eq!(ok.warn_ok("persist session"), Some(1));
    }

    #[test]
    fn test_log_none() {
        assert_eq!(Some(3).log_none("ctx"), Some(3));
        assert_eq!(None::<i32>.log_none("ctx"), None);
    }
}
