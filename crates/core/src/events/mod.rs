//! Refresh events module.
//!
//! Provides the refresh event type and the sink trait the orchestrator emits
//! through. The server subscribes to the broadcast sink and streams events to
//! consumers.

mod refresh_event;
mod sink;

pub use refresh_event::*;
pub use sink::*;
