//! Relay server and chat client talking over a real socket.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use relay_chat::client::{ChatClient, HttpRelay, Submission, FAILURE_MESSAGE};
use relay_chat::config::Config;
use relay_chat::conversation::{Message, Role};
use relay_chat::providers::{CompletionProvider, CompletionStream, ProviderError};
use relay_chat::routes::{self, RELAY_PATH};
use relay_chat::AppState;

/// Upstream stand-in: emits the given fragments, then optionally fails.
struct FakeUpstream {
    fragments: Vec<&'static str>,
    fail_after: bool,
    refuse: bool,
}

impl FakeUpstream {
    fn emitting(fragments: Vec<&'static str>) -> Self {
        Self {
            fragments,
            fail_after: false,
            refuse: false,
        }
    }
}

#[async_trait]
impl CompletionProvider for FakeUpstream {
    fn name(&self) -> &str {
        "fake"
    }

    async fn stream_chat(
        &self,
        _model: &str,
        _messages: &[Message],
    ) -> Result<CompletionStream, ProviderError> {
        if self.refuse {
            return Err(ProviderError::Status {
                status: 401,
                message: "missing API key".into(),
            });
        }
        let mut items: Vec<Result<String, ProviderError>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        if self.fail_after {
            items.push(Err(ProviderError::Stream("upstream hung up".into())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

async fn start_relay(upstream: FakeUpstream) -> String {
    let app = routes::app(AppState::new(Config::default(), Arc::new(upstream)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}{}", addr, RELAY_PATH)
}

#[tokio::test]
async fn reply_is_concatenation_of_fragments() {
    let url = start_relay(FakeUpstream::emitting(vec!["Hel", "lo", ", ", "wörld", "!"])).await;
    let client = ChatClient::new(HttpRelay::new(url));

    assert_eq!(client.send("hi").await, Submission::Completed);

    let state = client.state();
    let transcript: Vec<(Role, &str)> = state
        .transcript
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        transcript,
        vec![(Role::User, "hi"), (Role::Assistant, "Hello, wörld!")]
    );
    assert!(!state.busy);
}

#[tokio::test]
async fn upstream_failure_mid_stream_truncates_reply() {
    let url = start_relay(FakeUpstream {
        fail_after: true,
        ..FakeUpstream::emitting(vec!["Hel", "lo"])
    })
    .await;
    let client = ChatClient::new(HttpRelay::new(url));

    assert_eq!(client.send("hi").await, Submission::Completed);

    let state = client.state();
    assert_eq!(state.transcript.len(), 2);
    assert_eq!(state.transcript.last().unwrap().content, "Hello");
    assert!(!state.busy);
}

#[tokio::test]
async fn upstream_failure_before_first_fragment_shows_failure_message() {
    let url = start_relay(FakeUpstream {
        fail_after: true,
        ..FakeUpstream::emitting(Vec::new())
    })
    .await;
    let client = ChatClient::new(HttpRelay::new(url));

    assert_eq!(client.send("hi").await, Submission::Failed);

    let state = client.state();
    assert_eq!(state.transcript.len(), 2);
    assert_eq!(
        state.transcript.last().unwrap(),
        &Message::assistant(FAILURE_MESSAGE)
    );
    assert!(!state.busy);
}

#[tokio::test]
async fn upstream_refusal_shows_failure_message() {
    let url = start_relay(FakeUpstream {
        refuse: true,
        ..FakeUpstream::emitting(Vec::new())
    })
    .await;
    let client = ChatClient::new(HttpRelay::new(url));

    assert_eq!(client.send("hi").await, Submission::Failed);

    let state = client.state();
    assert_eq!(state.transcript.len(), 2);
    assert_eq!(
        state.transcript.last().unwrap(),
        &Message::assistant(FAILURE_MESSAGE)
    );
    assert!(!state.busy);
}

#[tokio::test]
async fn raw_http_contract() {
    let url = start_relay(FakeUpstream::emitting(vec!["a", "b", "c"])).await;
    let http = reqwest::Client::new();

    let missing = http.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(missing.status(), 400);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Missing query" }));

    let ok = http
        .post(&url)
        .json(&json!({ "query": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(
        ok.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(ok.text().await.unwrap(), "abc");

    let malformed = http
        .post(&url)
        .header("Content-Type", "application/json")
        .body("{\"query\":")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 500);
    let body: Value = malformed.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Something went wrong" }));
}
