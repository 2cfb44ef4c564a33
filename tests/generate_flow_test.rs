//! End-to-end flow: gateway event in, response envelope out, with a real
//! HTTP round trip to a mock provider and an in-memory store.

use chrono::DateTime;
use serde_json::Value;

use scriptgen_backend::event::{ApiEvent, ApiResponse};
use scriptgen_backend::handlers;
use scriptgen_backend::llm::ChatCompletionClient;
use scriptgen_backend::store::{MemoryStore, ScriptStore};

fn event_from(json: &str) -> ApiEvent {
    serde_json::from_str(json).unwrap()
}

fn body_json(response: &ApiResponse) -> Value {
    serde_json::from_str(&response.body).unwrap()
}

fn client_for(server: &mockito::ServerGuard) -> ChatCompletionClient {
    ChatCompletionClient::new(
        "test_key".to_string(),
        "deepseek-chat".to_string(),
        server.url(),
        4000,
        30,
    )
    .unwrap()
}

#[tokio::test]
async fn test_generate_flow_persists_and_returns_unfenced_code() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "```javascript\nfunction main() {\n  // обновляем цены\n}\n\nfunction onOpen() {}\n```"
                    }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let store = MemoryStore::new();
    let event = event_from(
        r#"{
            "httpMethod": "POST",
            "body": "{\"prompt\": \"обновить цены из прайса\", \"priceFolderId\": \"1AbC\"}"
        }"#,
    );

    let response = handlers::generate::handle(&event, &client, &store).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(
        response
            .headers
            .get("Access-Control-Allow-Origin")
            .map(String::as_str),
        Some("*")
    );

    let body = body_json(&response);
    let expected_code = "function main() {\n  // обновляем цены\n}\n\nfunction onOpen() {}";
    assert_eq!(body["code"], expected_code);
    assert_eq!(body["script_id"], 1);
    assert!(DateTime::parse_from_rfc3339(body["created_at"].as_str().unwrap()).is_ok());

    // The stored row matches what was returned to the caller.
    let stored = store.recent_scripts(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].prompt, "обновить цены из прайса");
    assert_eq!(stored[0].generated_code, expected_code);
}

#[tokio::test]
async fn test_generate_flow_surfaces_upstream_failure_without_insert() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let client = client_for(&server);
    let store = MemoryStore::new();
    let event = event_from(
        r#"{"httpMethod": "POST", "body": "{\"prompt\": \"задача\"}"}"#,
    );

    let response = handlers::generate::handle(&event, &client, &store).await;
    assert_eq!(response.status_code, 502);
    assert!(response.body.contains("upstream unavailable"));
    assert!(store.recent_scripts(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_cycle_generate_then_history() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(
            r#"{"choices": [{"message": {"role": "assistant", "content": "function main() {}"}}]}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let store = MemoryStore::new();

    for i in 0..3 {
        let event = ApiEvent {
            http_method: Some("POST".to_string()),
            body: Some(format!("{{\"prompt\": \"task {}\"}}", i)),
            query_string_parameters: None,
        };
        let response = handlers::generate::handle(&event, &client, &store).await;
        assert_eq!(response.status_code, 200);
    }

    let history_event = event_from(
        r#"{"httpMethod": "GET", "queryStringParameters": {"limit": "2"}}"#,
    );
    let response = handlers::history::handle(&history_event, &store).await;
    assert_eq!(response.status_code, 200);

    let body = body_json(&response);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["prompt"], "task 2");
    assert_eq!(history[1]["prompt"], "task 1");
    assert_eq!(history[0]["code"], "function main() {}");
}
