//! Authorization gate for streaming subscribers.
//!
//! The gate only answers "may this credential open a stream with this
//! scope". How tokens are issued or signed lives outside this crate; the
//! validators here cover dev mode and a static grant table.

mod validators;
pub use validators::*;


#[cfg(test)]
use mockall::automock;

use crate::AuthError;

/// Scope a caller must hold to open the route event stream
pub const ADMIN_ROUTE_SCOPE: &str = "route.admin";

#[cfg_attr(test, automock)]
pub trait TokenValidator: Send + Sync + 'static {
    /// Checks the raw `Authorization` header value against a required scope.
    ///
    /// An absent header is passed as an empty string.
    fn decode_token(
        &self,
        authorization: &str,
        scope: &str,
    ) -> std::result::Result<(), AuthError>;
}
