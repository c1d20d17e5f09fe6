//! Mock Reddit and completion servers shared by the scenario tests.

use seattle_simulator::Config;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/api/v1/access_token";
pub const BASE_CREATED_UTC: i64 = 1_700_000_000;

/// Reddit mock with the token endpoint already mounted.
pub async fn reddit_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 86400,
        })))
        .mount(&server)
        .await;
    server
}

pub fn listing(children: Vec<Value>) -> Value {
    json!({ "kind": "Listing", "data": { "children": children, "after": null } })
}

pub fn link(subreddit: &str, i: i64) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": format!("p{i}"),
            "title": format!("Post number {i}"),
            "selftext": "Drizzle again.",
            "author": "rainy_day",
            "score": i,
            "created_utc": (BASE_CREATED_UTC + i) as f64,
            "subreddit": subreddit,
        }
    })
}

pub async fn mount_listing(server: &MockServer, listing_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(listing_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn completion_body(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "model": "llama-3.1-8b-instant",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop",
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 40 },
    })
}

/// Completion mock answering every call with `text`; `expected` calls are
/// verified when the server drops.
pub async fn completion_server(text: &str, expected: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(text)))
        .expect(expected)
        .mount(&server)
        .await;
    server
}

pub fn config(reddit: &MockServer, llm: &MockServer) -> Config {
    let mut config = Config::default();
    config.comments_per_post = 0;
    config.reddit.client_id = Some("client-id".into());
    config.reddit.client_secret = Some("client-secret".into());
    config.reddit.username = Some("seattle_bot".into());
    config.reddit.password = Some("hunter2".into());
    config.reddit.api_base = reddit.uri();
    config.reddit.auth_url = format!("{}{TOKEN_PATH}", reddit.uri());
    config.reddit.timeout_secs = 5;
    config.llm.api_key = Some("gsk_test".into());
    config.llm.base_url = llm.uri();
    config.llm.timeout_secs = 5;
    config
}

/// The single completion request the server saw, as JSON.
pub async fn only_completion_request(llm: &MockServer) -> Value {
    let requests = llm.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1, "expected exactly one completion request");
    serde_json::from_slice(&requests[0].body).unwrap()
}
