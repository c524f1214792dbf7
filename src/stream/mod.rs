//! Route event stream
//!
//! ```text
//! GET /routing/v1/events
//!        │
//!        ▼
//! EventStreamHandler ── TokenValidator ──▶ 401 on failure
//!        │ open watch, SubscriptionGuard +1, 200 + event-stream headers
//!        ▼
//! Subscription::run (one task per connection)
//!        │  select { store error | shutdown | client gone | notification }
//!        ▼
//! translate() ─▶ WireEvent::encode() ─▶ body chunk
//! ```

mod event;
mod handler;
mod response;
mod subscription;

pub use event::*;
pub use handler::*;
pub use response::*;
pub use subscription::*;
