pub mod client;
pub mod types;

pub use client::{OpenAiTransport, CHAT_COMPLETIONS_PATH};
