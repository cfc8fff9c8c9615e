//! Utility macros for the client crate.

/// Returns early with `Err($error)` unless `$predicate` holds.
///
/// ```ignore
/// ensure!(handler.on_body(&chunk), TransportError::aborted());
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
