//! Folio - blog and portfolio persistence core
//!
//! Serves posts from one of two interchangeable backends, picked per request,
//! with opaque cursor pagination and a response cache that is invalidated by
//! key pattern after every write.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod model;
pub mod pagination;
pub mod services;
pub mod storage;
pub mod utils;
