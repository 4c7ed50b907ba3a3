pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod input;
pub mod mapping;
pub mod output;
pub mod paginate;
pub mod query;
pub mod request;
pub mod retry;
pub mod store;
pub mod transport;
pub mod wait;
