//! Chat-completion client for OpenAI-compatible local backends (LM Studio,
//! Ollama's compat endpoint, vLLM, ...).

mod client;
mod types;
mod wire;

pub use client::{ChatClient, GenerateOptions, GenerationError, TextGenerator};
pub use types::{Message, Role};
pub use wire::{ChatCompletionRequest, ChatCompletionResponse, Choice, ResponseMessage, Usage};
