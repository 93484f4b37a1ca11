#![allow(dead_code)]

use std::time::Duration;

use mock_ollama::{MockOllamaServer, ServerConfig};

/// Loopback server with a short chunk delay so streaming tests stay quick.
pub fn fast_config() -> ServerConfig {
    ServerConfig::local().with_chunk_delay(Duration::from_millis(1))
}

pub async fn start(config: ServerConfig) -> MockOllamaServer {
    MockOllamaServer::start(config)
        .await
        .expect("mock server starts")
}

/// Proxies are bypassed so requests always reach the loopback server.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("http client builds")
}

pub fn parse_ndjson(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("each line is a json document"))
        .collect()
}

pub fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

pub fn assert_cors(response: &reqwest::Response) {
    assert_eq!(header(response, "access-control-allow-origin"), Some("*"));
    assert_eq!(
        header(response, "access-control-allow-methods"),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(
        header(response, "access-control-allow-headers"),
        Some("Content-Type")
    );
}
