use super::types::{HuggingFaceConfig, DEFAULT_MODEL};
use super::HuggingFaceProvider;
use crate::error::ProviderFailure;
use crate::provider::TextProvider;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_default_config() {
    let config = HuggingFaceConfig::default();
    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.max_new_tokens, 100);
    assert_eq!(config.timeout, Duration::from_secs(120));
}

#[tokio::test]
async fn test_generate_trims_output_and_reports_served_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "inputs": "Hello",
            "parameters": {"max_new_tokens": 100, "do_sample": true}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"generated_text": "  Hi!  \n"})),
        )
        .mount(&server)
        .await;

    let provider =
        HuggingFaceProvider::new(HuggingFaceConfig::new().with_base_url(server.uri())).unwrap();
    let generation = provider.generate("Hello", Some("other/model")).await.unwrap();

    assert_eq!(generation.text, "Hi!");
    assert_eq!(generation.model, DEFAULT_MODEL);
}

#[tokio::test]
async fn test_generate_accepts_batch_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "batched"}])),
        )
        .mount(&server)
        .await;

    let provider =
        HuggingFaceProvider::new(HuggingFaceConfig::new().with_base_url(server.uri())).unwrap();
    let generation = provider.generate("Hello", None).await.unwrap();
    assert_eq!(generation.text, "batched");
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": "Model is overloaded"})),
        )
        .mount(&server)
        .await;

    let provider =
        HuggingFaceProvider::new(HuggingFaceConfig::new().with_base_url(server.uri())).unwrap();
    let err = provider.generate("Hello", None).await.unwrap_err();

    assert_eq!(err.provider, "huggingface");
    assert_eq!(
        err.cause,
        ProviderFailure::Status {
            status: 503,
            message: "Model is overloaded".to_string()
        }
    );
}

#[tokio::test]
async fn test_blank_generation_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"generated_text": ""})))
        .mount(&server)
        .await;

    let provider =
        HuggingFaceProvider::new(HuggingFaceConfig::new().with_base_url(server.uri())).unwrap();
    let err = provider.generate("Hello", None).await.unwrap_err();
    assert!(matches!(err.cause, ProviderFailure::Malformed(_)));
}
