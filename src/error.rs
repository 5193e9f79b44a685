//! Error types for the region-initialisation entry point.
//!
//! Every other misuse (corrupt header on free, double free) stays a debug
//! assertion — those are triggered from arbitrary `free()` call sites where
//! a `Result` has no caller to return to. `init()` is the one entry point
//! under the caller's direct control, so its misuse outcomes get a proper
//! error enum instead.

/// Reasons [`RegionHeap::init`](crate::RegionHeap::init) can refuse to
/// (re-)initialise an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// `regions` was empty, or every supplied region was too small to host
    /// even its own tail sentinel plus one minimum-sized free block.
    #[error("no usable regions were supplied to init()")]
    NoRegions,
    /// Two consecutive entries in `regions` were not in strictly ascending
    /// `start` order.
    #[error("regions must be supplied in strictly ascending start-address order")]
    MisorderedRegions,
    /// `init()` was already called successfully once for this instance.
    #[error("init() was already called once for this allocator instance")]
    AlreadyInitialized,
}
