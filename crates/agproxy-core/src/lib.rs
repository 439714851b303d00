pub mod auth;
pub mod core;
pub mod error;
pub mod handler;

pub use core::{Core, CoreState};
pub use error::ProxyError;
