use httpmock::prelude::*;
use jobscout::adapters::gemini::{GeminiClient, GeminiEmbed, GeminiGenerate, API_KEY_HEADER};
use jobscout::core::analysis::Analyzer;
use jobscout::core::key_pool::KeyPool;
use jobscout::core::rate_limit::CallSpacing;
use jobscout::core::resilient::{CredentialMatcher, KeyState, ResilientClient};
use jobscout::domain::ports::{AnalysisRequest, CallFailure, GenerateRequest, JobAnalyzer};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const KEYS: [&str; 3] = [
    "AIzaKeyNumberOne-000000",
    "AIzaKeyNumberTwo-000000",
    "AIzaKeyNumberThree-0000",
];

fn pool() -> Arc<KeyPool> {
    Arc::new(KeyPool::new(KEYS.iter().map(|k| k.to_string())).unwrap())
}

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
}

fn request() -> GenerateRequest {
    GenerateRequest {
        system_instruction: "Return JSON".into(),
        prompt: "Job Title: Dev".into(),
    }
}

#[tokio::test]
async fn test_all_keys_rate_limited_returns_default() {
    let server = MockServer::start();
    let mocks: Vec<_> = KEYS
        .iter()
        .map(|key| {
            server.mock(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .header(API_KEY_HEADER, *key);
                then.status(429)
                    .body("{\"error\": {\"status\": \"RESOURCE_EXHAUSTED\"}}");
            })
        })
        .collect();

    let client = ResilientClient::new(GeminiGenerate::new(gemini(&server), "gemini-test"), pool());

    let (result, states) = client.try_call_traced(&request()).await;
    assert!(matches!(result, Err(CallFailure::Exhausted { attempts: 3, .. })));
    assert_eq!(states.first(), Some(&KeyState::Ready(0)));
    assert_eq!(states.last(), Some(&KeyState::Exhausted));
    for mock in &mocks {
        assert_eq!(mock.hits(), 1);
    }

    // The infallible entry point degrades to an empty reply.
    assert_eq!(client.call(&request()).await, "");
}

#[tokio::test]
async fn test_rotates_past_revoked_key_and_stays_there() {
    let server = MockServer::start();
    let revoked = server.mock(|when, then| {
        when.method(POST).header(API_KEY_HEADER, KEYS[0]);
        then.status(403).body("API key not valid");
    });
    let working = server.mock(|when, then| {
        when.method(POST).header(API_KEY_HEADER, KEYS[1]);
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text":
                "```json\n{\"skills\": [\"rust\"], \"yoe\": \"2\"}\n```"}]}}]
        }));
    });

    let client = ResilientClient::new(GeminiGenerate::new(gemini(&server), "gemini-test"), pool())
        .with_spacing(Arc::new(CallSpacing::new(Duration::from_millis(10))));
    let analyzer = Analyzer::new(client);

    let request = AnalysisRequest {
        job_title: "Dev".into(),
        content: "Rust services".into(),
    };
    let first = analyzer.analyze(&request).await.unwrap();
    let second = analyzer.analyze(&request).await.unwrap();

    assert_eq!(first.skills, vec!["rust"]);
    assert_eq!(second.yoe, "2");
    assert_eq!(revoked.hits(), 1);
    assert_eq!(working.hits(), 2);
    assert_eq!(analyzer.client().pool().current_index(), 1);
}

#[tokio::test]
async fn test_server_error_does_not_rotate() {
    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(POST);
        then.status(500).body("backend unavailable");
    });

    let client = ResilientClient::new(GeminiGenerate::new(gemini(&server), "gemini-test"), pool());

    let result = client.try_call(&request()).await;

    assert!(matches!(result, Err(CallFailure::Rejected { .. })));
    assert_eq!(failing.hits(), 1);
    assert_eq!(client.pool().current_index(), 0);
}

#[tokio::test]
async fn test_embedding_client_rotates_on_internal_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).header(API_KEY_HEADER, KEYS[0]);
        then.status(500).body("{\"error\": {\"status\": \"INTERNAL\"}}");
    });
    server.mock(|when, then| {
        when.method(POST).header(API_KEY_HEADER, KEYS[1]);
        then.status(200)
            .json_body(json!({"embedding": {"values": [0.1, 0.2]}}));
    });

    let client = ResilientClient::new(GeminiEmbed::new(gemini(&server), "embed-test"), pool())
        .with_matcher(CredentialMatcher::default().with_marker("internal"));

    let values = client.call(&"text".to_string()).await;

    assert_eq!(values, vec![0.1, 0.2]);
}
