pub mod client;
pub mod config;
pub mod error;
pub mod generate;
pub mod models;

pub use client::shared_client;
pub use config::UpstreamConfig;
pub use error::UpstreamError;
pub use generate::{stream_generate, AssistantEventStream};
pub use models::fetch_models;
