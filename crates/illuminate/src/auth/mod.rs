//! Extension token handling.
//!
//! Inbound broadcaster and viewer tokens are verified against the shared
//! extension secret; outbound `external` tokens are minted with the same key.

mod claims;
mod credentials;
mod error;
mod extract;

pub use claims::{Claims, PubSubPerms, Role};
pub use credentials::{DEFAULT_TOKEN_TTL_SECS, ExtensionAuth, MAX_TOKEN_TTL_SECS};
pub use error::AuthError;
pub use extract::request_token;
