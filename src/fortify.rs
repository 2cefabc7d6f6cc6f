//! Fortification checks — always-on guards against API misuse.
//!
//! Out-of-range indices, corrupted container headers and use of empty
//! containers where an element is required are programmer errors, not
//! recoverable conditions. A failed check terminates with the source
//! location of the check; nothing is propagated to the caller.

/// Terminate the process because a fortification check failed.
///
/// Split out of the macro so the cold path stays out of line.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fortify_check_failed(cond: &'static str) -> ! {
    panic!("fortify check failed: {cond}");
}

/// Check an API precondition.
///
/// Unlike `debug_assert!`, this is compiled into release builds; the
/// containers rely on it for bounds and header validation.
#[macro_export]
macro_rules! fortify_check {
    ($cond:expr) => {
        if !$cond {
            $crate::fortify::fortify_check_failed(stringify!($cond));
        }
    };
}
