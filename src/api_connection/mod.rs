pub mod connection;
pub mod endpoints;

pub use connection::{ApiConnectionError, Encoder, EncoderConfig, OllamaClient};
