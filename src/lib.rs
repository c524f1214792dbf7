//! Live route-change event stream for the routing registry.
//!
//! Subscribers open `GET /routing/v1/events` and receive every change to the
//! route table as a server-sent event until they disconnect, the store fails
//! or the service shuts down.

mod auth;
mod config;
mod errors;
mod metrics;
mod server;
mod store;
mod stream;

pub use auth::*;
pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use server::*;
pub use store::*;
pub use stream::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
