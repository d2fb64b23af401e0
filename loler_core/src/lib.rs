pub mod api;
pub mod config;
pub mod device_auth;
pub mod error;
pub mod github;
pub mod memory_lol;
pub mod session;

pub use error::{CoreError, Result};
