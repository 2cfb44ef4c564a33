//! GET handler: the most recent generated scripts, newest first.

use anyhow::Context;
use serde_json::json;
use tracing::warn;

use crate::error::HandlerError;
use crate::event::{ApiEvent, ApiResponse};
use crate::store::ScriptStore;

const DEFAULT_LIMIT: i64 = 20;

pub async fn handle(event: &ApiEvent, store: &dyn ScriptStore) -> ApiResponse {
    if event.method() == "OPTIONS" {
        return ApiResponse::preflight("GET, OPTIONS");
    }
    if event.method() != "GET" {
        return HandlerError::MethodNotAllowed.into_response();
    }

    match run(event, store).await {
        Ok(response) => response,
        Err(error) => {
            warn!("history failed: {}", error);
            error.into_response()
        }
    }
}

async fn run(event: &ApiEvent, store: &dyn ScriptStore) -> Result<ApiResponse, HandlerError> {
    let limit: i64 = match event.query_param("limit") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid limit value: {:?}", raw))?,
        None => DEFAULT_LIMIT,
    };

    let scripts = store.recent_scripts(limit).await?;
    let history: Vec<_> = scripts
        .iter()
        .map(|script| {
            json!({
                "id": script.id,
                "prompt": script.prompt,
                "code": script.generated_code,
                "created_at": script.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(ApiResponse::ok(&json!({ "history": history })))
}
