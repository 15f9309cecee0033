use futures::future::BoxFuture;
use reqwest::Client;

use crate::{
    config::GeminiConfig,
    keywords::{parse_keywords, GeneratedKeywords, GenerationError, KeywordSource},
};

use super::inference::{build_request, endpoint, extract_text};

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    pub fn has_credential(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub async fn generate_keywords(&self, task: &str) -> Result<GeneratedKeywords, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerationError::MissingCredential)?;

        let request = build_request(task, &self.config);
        let response = self
            .http
            .post(endpoint(&self.config))
            .query(&[("key", api_key)])
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = extract_text(&response.text().await?);
        match parse_keywords(&raw) {
            Some((keywords, stage)) => Ok(GeneratedKeywords {
                keywords,
                raw,
                stage,
            }),
            None => Err(GenerationError::Unparsable { raw }),
        }
    }
}

impl KeywordSource for GeminiClient {
    fn generate<'a>(
        &'a self,
        task: &'a str,
    ) -> BoxFuture<'a, Result<GeneratedKeywords, GenerationError>> {
        Box::pin(self.generate_keywords(task))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::keywords::ParseStage;

    fn client(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            Client::new(),
            GeminiConfig {
                api_key: api_key.map(str::to_string),
                base_url: format!("{}/v1beta/models", server.uri()),
                ..GeminiConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn posts_prompt_and_parses_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemma-3n-e4b-it:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({"generationConfig": {"maxOutputTokens": 2048}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Here are keywords: [\"Rust\", \"cargo\"]"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generated = client(&server, Some("test-key"))
            .generate_keywords("learn rust")
            .await
            .unwrap();
        assert_eq!(generated.stage, ParseStage::BracketArray);
        assert_eq!(generated.keywords.iter().collect::<Vec<_>>(), vec!["rust", "cargo"]);
        assert!(generated.raw.starts_with("Here are keywords"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server, Some("test-key"))
            .generate_keywords("learn rust")
            .await
            .unwrap_err();
        match err {
            GenerationError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_generation_is_unparsable_but_keeps_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "[]"})))
            .mount(&server)
            .await;

        let err = client(&server, Some("test-key"))
            .generate_keywords("learn rust")
            .await
            .unwrap_err();
        assert_eq!(err.raw_response(), Some("[]"));
    }

    #[tokio::test]
    async fn missing_key_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server, None);
        assert!(!client.has_credential());
        let err = client.generate_keywords("learn rust").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential));
        assert!(err.is_configuration());
    }
}
