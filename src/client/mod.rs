//! The authenticated HTTP client and its refresh machinery.

pub mod client;
pub mod error;
mod refresh;
mod session;

// Re-export from client.rs so we can do "use crate::client::*;"
pub use client::AuthenticatedHttpClient;
pub use error::ClientError;
