pub mod page;
pub mod request;
pub mod token;

pub use page::Page;
pub use request::{ApiRequest, PendingRequest, ResponseBody, ResponseKind};
pub use token::{LoginRequest, TokenPair};
