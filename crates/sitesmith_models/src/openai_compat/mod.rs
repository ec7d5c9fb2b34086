//! Chat-completions API integration shared by OpenAI and DeepSeek.

mod client;
mod dto;

pub use client::OpenAiCompatibleClient;
