use super::client::{MockGenerator, ScriptGenerator};
use super::client_impl::ChatCompletionClient;
use crate::config::{LlmConfig, Provider};
use crate::error::HandlerError;

/// Create a generator for the configured provider. Mock mode needs no
/// credentials or network; everything else goes through the
/// chat-completion client.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn ScriptGenerator>, HandlerError> {
    match config.provider {
        Provider::Mock => Ok(Box::new(MockGenerator::new())),
        Provider::DeepSeek | Provider::Polza | Provider::OpenAi => {
            Ok(Box::new(ChatCompletionClient::from_config(config)?))
        }
    }
}
