pub mod client;
pub mod inference;

pub use client::GeminiClient;
