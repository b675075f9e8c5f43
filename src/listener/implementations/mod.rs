// Bundled listeners

// Immediate listeners
pub mod event_logger;
pub mod timestamp_transform;

// Commit handlers (wrap in DeferredListener)
pub mod cache_invalidation;

pub use cache_invalidation::*;
pub use event_logger::*;
pub use timestamp_transform::*;
