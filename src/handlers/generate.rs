//! POST handler: generate an Apps Script for a prompt and persist it.

use anyhow::Context;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::HandlerError;
use crate::event::{ApiEvent, ApiResponse};
use crate::llm::prompts::strip_code_fence;
use crate::llm::{ScriptGenerator, ScriptRequest};
use crate::store::ScriptStore;

pub async fn handle(
    event: &ApiEvent,
    generator: &dyn ScriptGenerator,
    store: &dyn ScriptStore,
) -> ApiResponse {
    if event.method() == "OPTIONS" {
        return ApiResponse::preflight("POST, OPTIONS");
    }
    if event.method() != "POST" {
        return HandlerError::MethodNotAllowed.into_response();
    }

    match run(event, generator, store).await {
        Ok(response) => response,
        Err(error) => {
            warn!("generate failed: {}", error);
            error.into_response()
        }
    }
}

async fn run(
    event: &ApiEvent,
    generator: &dyn ScriptGenerator,
    store: &dyn ScriptStore,
) -> Result<ApiResponse, HandlerError> {
    let body = event.json_body()?;
    let mut request: ScriptRequest =
        serde_json::from_value(body).context("request body has unexpected shape")?;

    request.prompt = request.prompt.trim().to_string();
    if request.prompt.is_empty() {
        return Err(HandlerError::Validation("Prompt is required".to_string()));
    }

    let raw = generator.generate(&request).await?;
    let code = strip_code_fence(&raw);

    // The insert only runs after a successful generation; if it fails the
    // generated code is discarded with the error.
    let inserted = store.insert_script(&request.prompt, &code).await?;
    debug!("Stored generated script id={}", inserted.id);

    Ok(ApiResponse::ok(&json!({
        "code": code,
        "script_id": inserted.id,
        "created_at": inserted.created_at.to_rfc3339(),
    })))
}
