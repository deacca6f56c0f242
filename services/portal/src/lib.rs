//! Portal client
//!
//! Client-side session handling for the compliance portal: sign-in against the
//! Identity API, a persisted session with inactivity expiry, and the
//! compliance assistant endpoints.

pub mod assistant;
pub mod config;
pub mod error;
pub mod flow;
pub mod identity;
pub mod models;
pub mod session;
pub mod validation;

pub use error::{PortalError, PortalResult};
