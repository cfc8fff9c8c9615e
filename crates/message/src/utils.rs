//! Utility macros shared by the message modules.

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// It's used by the validators of every value object, where a broken invariant must
/// surface as a [`MessageError`](crate::MessageError) to the caller.
///
/// # Example
///
/// ```ignore
/// ensure!(!method.is_empty(), MessageError::invalid_argument("method must be a non-empty string"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
