//! Application services.

pub mod posts;

pub use posts::{PostService, ServiceError};
