use async_trait::async_trait;
use serde::Deserialize;

use crate::error::HandlerError;

/// Parsed body of a generation request.
///
/// The optional fields come from the settings panel of the web app and only
/// enrich the prompt text; the camelCase aliases match what the frontend
/// sends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, alias = "priceFolderId")]
    pub drive_folder_id: Option<String>,
    #[serde(default, alias = "opencartApiUrl")]
    pub shop_api_url: Option<String>,
    #[serde(default, alias = "opencartApiKey")]
    pub shop_api_key: Option<String>,
    #[serde(default, alias = "adminEmail")]
    pub admin_email: Option<String>,
}

/// Produces Apps Script source text for a request.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, request: &ScriptRequest) -> Result<String, HandlerError>;
}

/// Mock mode: no external provider, a fixed-shape placeholder script with a
/// truncated echo of the prompt.
pub struct MockGenerator;

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptGenerator for MockGenerator {
    async fn generate(&self, request: &ScriptRequest) -> Result<String, HandlerError> {
        let header_echo: String = request.prompt.chars().take(100).collect();
        let body_echo: String = request.prompt.chars().take(200).collect();

        Ok(format!(
            r#"// Скрипт для задачи: {header_echo}...

function main() {{
  const sheet = SpreadsheetApp.getActiveSheet();
  const data = sheet.getDataRange().getValues();

  Logger.log('Обработка данных...');

  // TODO: Реализовать логику на основе запроса:
  // {body_echo}

  SpreadsheetApp.getUi().alert('Скрипт выполнен!');
}}

function onOpen() {{
  const ui = SpreadsheetApp.getUi();
  ui.createMenu('Автоматизация')
    .addItem('Запустить', 'main')
    .addToUi();
}}"#
        ))
    }
}
