use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;

fn keyword_prompt(task: &str) -> String {
    format!(
        r#"You are a helpful AI assistant tasked with generating relevant search keywords for a user's task.
For the given task, provide a comprehensive list of keywords and phrases that would be found on web pages relevant to this task.
Include specific terminology, concepts, tools, technologies, and related topics.

TASK: "{task}"

Output ONLY a JSON array containing the keywords, formatted as:
["keyword1", "keyword2", "phrase one", "phrase two"]

Include at least 300 keywords, which are single words recognized by the English Dictionary.
Aside from these 300 keywords, include 200 keywords for related topics. For example, if the topic is 'Python - The coding language', keywords such as 'Javascript' should also appear.
So in total there should be 500 keywords.
Ensure all keywords are relevant to the task and sufficiently distinctive to identify related content."#
    )
}

pub fn endpoint(config: &GeminiConfig) -> String {
    format!(
        "{}/{}:generateContent",
        config.base_url.trim_end_matches('/'),
        config.model
    )
}

pub fn build_request(task: &str, config: &GeminiConfig) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(keyword_prompt(task)),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

/// Pulls the generated text out of a response body. Gemini and Gemma models
/// do not agree on where it lives, so every known location is tried and a
/// body that is not JSON at all is treated as the text itself.
pub fn extract_text(body: &str) -> String {
    let Ok(response) = serde_json::from_str::<GenerateContentResponse>(body) else {
        return body.to_string();
    };

    let first = response.candidates.into_iter().next();
    let from_parts = first
        .as_ref()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.clone());
    let from_output = first.and_then(|candidate| candidate.output);

    [from_parts, from_output, response.text]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_uses_camel_case_generation_config() {
        let request = build_request("learn rust", &GeminiConfig::default());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], json!(2048));
        let prompt = value["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains(r#"TASK: "learn rust""#));
    }

    #[test]
    fn endpoint_joins_model_without_double_slash() {
        let config = GeminiConfig {
            base_url: "http://localhost:9000/models/".to_string(),
            ..GeminiConfig::default()
        };
        assert_eq!(
            endpoint(&config),
            "http://localhost:9000/models/gemma-3n-e4b-it:generateContent"
        );
    }

    #[test]
    fn text_is_found_in_any_known_location() {
        let parts = json!({"candidates": [{"content": {"parts": [{"text": "[\"a\"]"}]}}]});
        assert_eq!(extract_text(&parts.to_string()), "[\"a\"]");

        let output = json!({"candidates": [{"output": "b, c"}]});
        assert_eq!(extract_text(&output.to_string()), "b, c");

        let top = json!({"candidates": [], "text": "d"});
        assert_eq!(extract_text(&top.to_string()), "d");

        assert_eq!(extract_text("plain words"), "plain words");
        assert_eq!(extract_text("{}"), "");
    }
}
