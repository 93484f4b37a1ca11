mod common;

use common::{assert_cors, client, fast_config, header, start};
use mock_ollama::types::{ErrorBody, GenerateResponse, ModelList};
use mock_ollama::{MockOllamaServer, ServerConfig, ServerError};

#[tokio::test]
async fn tags_lists_the_builtin_models() {
    let server = start(fast_config()).await;

    let response = client()
        .get(format!("{}/api/tags", server.base_url()))
        .send()
        .await
        .expect("tags request succeeds");

    assert_eq!(response.status(), 200);
    assert_cors(&response);
    assert_eq!(header(&response, "content-type"), Some("application/json"));

    let listing: ModelList = response.json().await.expect("tags body is a model list");
    assert_eq!(listing, ModelList::builtin());

    let names: Vec<&str> = listing
        .models
        .iter()
        .map(|model| model.name.as_str())
        .collect();
    assert_eq!(names, vec!["llama2", "mistral", "gemma"]);

    for model in &listing.models {
        assert!(!model.modified_at.is_empty());
        assert!(model.size > 0);
    }

    server.shutdown().await;
}

// Unknown routes answer 200 with an error body on purpose; callers must
// look at the body, not the status.
#[tokio::test]
async fn unknown_routes_are_ok_with_error_body() {
    let server = start(fast_config()).await;
    let client = client();

    let get = client
        .get(format!("{}/api/version", server.base_url()))
        .send()
        .await
        .expect("get succeeds");
    assert_eq!(get.status(), 200);
    assert_cors(&get);
    let body: serde_json::Value = get.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({ "error": "Endpoint not found" }));

    let post = client
        .post(format!("{}/api/chat", server.base_url()))
        .body(r#"{"model": "llama2"}"#)
        .send()
        .await
        .expect("post succeeds");
    assert_eq!(post.status(), 200);
    assert_cors(&post);
    let body: ErrorBody = post.json().await.expect("error body");
    assert_eq!(body, ErrorBody::endpoint_not_found());

    server.shutdown().await;
}

#[tokio::test]
async fn preflight_returns_headers_only() {
    let server = start(fast_config()).await;

    let response = client()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/generate", server.base_url()),
        )
        .header("Origin", "chrome-extension://abcdef")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("preflight succeeds");

    assert_eq!(response.status(), 200);
    assert_cors(&response);
    assert!(response.headers().get("content-type").is_none());
    assert!(response.headers().get("x-frame-options").is_none());
    assert!(response.bytes().await.expect("body reads").is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn generate_echoes_prompt_verbatim() {
    let server = start(fast_config()).await;
    let prompt = "  Résumé this: line one\nline two  ";

    let response = client()
        .post(format!("{}/api/generate", server.base_url()))
        .json(&serde_json::json!({ "prompt": prompt, "model": "mistral" }))
        .send()
        .await
        .expect("generate succeeds");

    assert_eq!(response.status(), 200);
    assert_cors(&response);
    assert_eq!(header(&response, "content-type"), Some("application/json"));

    let body: GenerateResponse = response.json().await.expect("generate body");
    assert_eq!(
        body,
        GenerateResponse {
            model: "mistral".to_string(),
            response: format!("This is a mock response to: {}", prompt),
            done: true,
        }
    );

    server.shutdown().await;
}

#[tokio::test]
async fn generate_with_malformed_json_uses_defaults() {
    let server = start(fast_config()).await;

    let response = client()
        .post(format!("{}/api/generate", server.base_url()))
        .header("Content-Type", "application/json")
        .body("{\"prompt\": \"unterminated")
        .send()
        .await
        .expect("generate succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(
        body,
        serde_json::json!({
            "model": "llama2",
            "response": "This is a mock response to: ",
            "done": true,
        })
    );

    server.shutdown().await;
}

#[tokio::test]
async fn generate_path_ignores_query_string() {
    let server = start(fast_config()).await;

    let response = client()
        .post(format!("{}/api/generate?source=popup", server.base_url()))
        .json(&serde_json::json!({ "prompt": "hi" }))
        .send()
        .await
        .expect("generate succeeds");

    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["response"], "This is a mock response to: hi");

    server.shutdown().await;
}

#[tokio::test]
async fn frame_header_follows_config() {
    let allowed = start(fast_config().with_iframe(true)).await;
    let denied = start(fast_config()).await;
    let client = client();

    for (server, expected) in [(&allowed, Some("ALLOWALL")), (&denied, None)] {
        let response = client
            .get(format!("{}/api/tags", server.base_url()))
            .send()
            .await
            .expect("tags succeeds");
        assert_eq!(header(&response, "x-frame-options"), expected);

        let response = client
            .request(reqwest::Method::OPTIONS, server.base_url())
            .send()
            .await
            .expect("preflight succeeds");
        assert_eq!(header(&response, "x-frame-options"), expected);
    }

    allowed.shutdown().await;
    denied.shutdown().await;
}

#[tokio::test]
async fn cors_is_sent_without_allow_cors_flag() {
    let server = start(fast_config()).await;
    assert!(!server.config().allow_cors);

    let response = client()
        .post(format!("{}/api/generate", server.base_url()))
        .body("{}")
        .send()
        .await
        .expect("generate succeeds");
    assert_cors(&response);

    server.shutdown().await;
}

#[tokio::test]
async fn unsupported_methods_are_not_implemented() {
    let server = start(fast_config()).await;

    let response = client()
        .delete(format!("{}/api/tags", server.base_url()))
        .send()
        .await
        .expect("delete gets an answer");

    assert_eq!(response.status(), 501);
    assert_cors(&response);
    let body: ErrorBody = response.json().await.expect("error body");
    assert_eq!(body.error, "Unsupported method ('DELETE')");

    server.shutdown().await;
}

#[tokio::test]
async fn binding_a_taken_port_fails() {
    let first = start(fast_config()).await;
    let port = first.address().port();

    let second = MockOllamaServer::start(ServerConfig::local().with_port(port)).await;

    match second {
        Err(ServerError::Bind { addr, .. }) => {
            assert_eq!(addr, format!("127.0.0.1:{}", port));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("second bind on port {} should fail", port),
    }

    first.shutdown().await;
}
