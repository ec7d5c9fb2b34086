//! Anthropic Messages API integration.

mod client;
mod dto;

pub use client::AnthropicClient;
