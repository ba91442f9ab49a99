//! Library exports for kobetsu-client, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod models;
pub mod navigation;
pub mod store;
pub mod utils;

pub use client::{AuthenticatedHttpClient, ClientError};
pub use models::{ApiRequest, LoginRequest, Page, ResponseBody, ResponseKind, TokenPair};
pub use navigation::{CallbackNavigator, Navigator, TracingNavigator};
pub use store::{create_store, TokenStore};
