// Listener system: row mutation events, immediate listeners, and
// transaction-scoped deferred delivery

pub mod deferred;
pub mod error;
pub mod event;
pub mod implementations;
pub mod pipeline;
pub mod traits;

// Re-export core types
pub use deferred::*;
pub use error::*;
pub use event::*;
pub use implementations::*;
pub use pipeline::*;
pub use traits::*;
