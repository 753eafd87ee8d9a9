//! Authenticated-identity resolver
//!
//! The wallet core does not own registration or credential storage; it only
//! consumes "bearer token in, user id out". Tokens are verified against the
//! shared secret of the external auth service.

pub mod middleware;
pub mod service;

pub use service::{AuthService, Claims};
