//! Chatrelay - HTTP relay in front of hosted AI providers
//!
//! Accepts chat, image, vision, speech and Vertex requests from a browser
//! front end, forwards them to OpenAI, Venice or Vertex with server-side
//! credentials, and streams chat replies back as plain text fragments.

pub mod config;
pub mod error;
pub mod handlers;
pub mod relay;
pub mod testing;
pub mod types;
pub mod upstream;

pub use error::RelayError;
