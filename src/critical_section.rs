//! Critical section primitive.
//!
//! The free-list engine brackets every read-modify-write with a
//! suspend-scheduling/resume-scheduling pair. Exactly one host binding must
//! be selected at build time:
//!
//! - `host-none` (default): both operations are no-ops — single-threaded
//!   caller, no interrupt-context use.
//! - `host-cooperative`: suspend/resume become real scheduling yield-points,
//!   implemented through the `critical-section` crate.
//!
//! Selecting neither, or both, is a build failure.

#[cfg(all(feature = "host-none", feature = "host-cooperative"))]
compile_error!(
    "regionalloc: enable exactly one of the `host-none` / `host-cooperative` features, not both"
);

#[cfg(not(any(feature = "host-none", feature = "host-cooperative")))]
compile_error!(
    "regionalloc: enable exactly one of the `host-none` / `host-cooperative` features"
);

/// RAII guard for the critical section. Scheduling resumes when this is
/// dropped, which happens on every exit path (including early returns) —
/// a bare suspend/resume call pair repeated at each branch would risk
/// missing one on an early return.
pub(crate) struct CriticalGuard {
    #[cfg(feature = "host-cooperative")]
    restore: critical_section::RestoreState,
}

/// Suspend scheduling and obtain a guard that resumes it on drop.
#[cfg(feature = "host-none")]
#[inline]
pub(crate) fn enter() -> CriticalGuard {
    CriticalGuard {}
}

/// Suspend scheduling and obtain a guard that resumes it on drop.
#[cfg(feature = "host-cooperative")]
#[inline]
pub(crate) fn enter() -> CriticalGuard {
    // SAFETY: paired unconditionally with `release` in `Drop`, on the same
    // (single) thread of control that acquired it.
    let restore = unsafe { critical_section::acquire() };
    CriticalGuard { restore }
}

impl Drop for CriticalGuard {
    #[inline]
    fn drop(&mut self) {
        #[cfg(feature = "host-cooperative")]
        // SAFETY: `restore` was produced by the matching `acquire` above and
        // is released at most once.
        unsafe {
            critical_section::release(self.restore);
        }
    }
}
