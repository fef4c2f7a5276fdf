//! Client-side authorization helpers
//!
//! # Modules
//!
//! - [`authorization`]: Role capabilities and permission checks
//!
//! These checks decide what the client offers to the user. They are not a
//! security boundary: the API enforces its own rules and its rejections are
//! surfaced as ordinary errors.

pub mod authorization;

pub use authorization::{require_capability, require_role, ensure_not_self, AuthzError, Capability};
