//! The deduplicating fetch coordinator.
//!
//! - [`request`]: requests and their identity keys
//! - [`source`]: where a produced image came from
//! - [`task`]: the shared, cancellable handle for one pipeline
//! - [`registry`]: the pending-task map
//! - [`fetcher`]: the orchestrator tying cache, network and processor together
//! - [`error`]: the fetch error taxonomy

pub mod error;
pub mod fetcher;
pub mod registry;
pub mod request;
pub mod source;
pub mod task;
