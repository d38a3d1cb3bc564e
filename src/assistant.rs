use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::ServicesConfig;
use crate::errors::StudioResult;

/// チャット / レコメンドバックエンドへのクライアント
pub struct AssistantClient {
    http: Client,
    assistant_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Serialize)]
struct RecommendationRequest<'a> {
    brand_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    rationale: String,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub collections: Vec<String>,
    pub rationale: String,
}

impl AssistantClient {
    pub fn new(cfg: &ServicesConfig) -> StudioResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            assistant_url: cfg.assistant_url.clone(),
        })
    }

    /// 1 問 1 答のチャット。応答が欠けていたら定型文を返す
    pub fn chat(&self, query: &str) -> StudioResult<String> {
        let response: ChatResponse = self
            .http
            .post(format!("{}/chat", self.assistant_url))
            .json(&ChatRequest { query })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(response.answer.unwrap_or_else(|| "No response".to_string()))
    }

    pub fn recommendations(&self, brand_name: &str) -> StudioResult<Recommendation> {
        let response: RecommendationResponse = self
            .http
            .post(format!("{}/recommendations", self.assistant_url))
            .json(&RecommendationRequest { brand_name })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(Recommendation {
            collections: response.recommendations,
            rationale: response.rationale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_answer_falls_back_to_literal() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(
            response.answer.unwrap_or_else(|| "No response".to_string()),
            "No response"
        );
    }

    #[test]
    fn recommendation_defaults_are_empty() {
        let response: RecommendationResponse = serde_json::from_str("{}").unwrap();
        assert!(response.recommendations.is_empty());
        assert!(response.rationale.is_empty());

        let body = r#"{"recommendations":["azuki","doodles-official"],"rationale":"art style"}"#;
        let response: RecommendationResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.recommendations.len(), 2);
        assert_eq!(response.rationale, "art style");
    }
}
