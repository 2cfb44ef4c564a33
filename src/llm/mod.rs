pub mod client;
pub mod client_impl;
pub mod factory;
pub mod prompts;

pub use client::{MockGenerator, ScriptGenerator, ScriptRequest};
pub use client_impl::ChatCompletionClient;
pub use factory::create_generator;
