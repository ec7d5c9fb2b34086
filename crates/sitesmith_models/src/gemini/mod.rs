//! Google Gemini `generateContent` integration.

mod client;
mod dto;

pub use client::GeminiClient;
