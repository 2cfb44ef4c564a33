//! GET handler: the template library, optionally filtered by category.

use serde_json::json;
use tracing::warn;

use crate::error::HandlerError;
use crate::event::{ApiEvent, ApiResponse};
use crate::store::ScriptStore;

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
            warn!("templates failed: {}", error);
            error.into_response()
        }
    }
}

async fn run(event: &ApiEvent, store: &dyn ScriptStore) -> Result<ApiResponse, HandlerError> {
    // An empty category parameter means "no filter", same as absence.
    let category = event.query_param("category").filter(|c| !c.is_empty());
    let templates = store.templates(category).await?;
    Ok(ApiResponse::ok(&json!({ "templates": templates })))
}
