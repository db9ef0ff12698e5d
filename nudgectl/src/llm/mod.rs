pub mod client;

pub use client::{build_prompt, Advisor, LlmClient, LlmConfig, Suggestion};
