/// Gemini API backend
///
/// Calls `POST /v1beta/models/{model}:generateContent` and flattens the first
/// candidate into text plus web citations.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::UpstreamError,
    models::GroundingReference,
    services::generation::{GenerationRequest, GenerationResponse, GenerationService},
};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Text used when the model returns no candidates at all
const EMPTY_RESPONSE_TEXT: &str = "[]";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            model
        )
    }
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    let tools = if request.search_grounding {
        vec![Tool {
            google_search: GoogleSearch {},
        }]
    } else {
        Vec::new()
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![RequestPart {
                text: &request.prompt,
            }],
        }],
        tools,
    }
}

/// Flattens the first candidate into our response shape
fn into_generation_response(response: GenerateContentResponse) -> GenerationResponse {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return GenerationResponse::text(EMPTY_RESPONSE_TEXT);
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let grounding = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .map(|web| GroundingReference {
                    uri: web.uri,
                    title: web.title,
                })
                .collect()
        })
        .unwrap_or_default();

    GenerationResponse {
        text: if text.trim().is_empty() {
            EMPTY_RESPONSE_TEXT.to_string()
        } else {
            text
        },
        grounding,
    }
}

/// Maps a non-success HTTP response body to a classified upstream error
fn error_from_status(status: u16, body: &str) -> UpstreamError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    UpstreamError::classify(Some(status), message)
}

#[async_trait::async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let url = self.endpoint(&request.model);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_request_body(request))
            .send()
            .await
            .map_err(|e| UpstreamError::classify(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %body,
                model = %request.model,
                "Gemini API request failed"
            );
            return Err(error_from_status(status.as_u16(), &body));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| UpstreamError::classify(None, e.to_string()))?;
        tracing::debug!(response = %response_text, "Raw Gemini API response");

        let decoded: GenerateContentResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                tracing::error!(error = %e, "Failed to deserialize Gemini response");
                UpstreamError::classify(None, format!("Failed to parse Gemini response: {}", e))
            })?;

        let generation = into_generation_response(decoded);

        tracing::info!(
            model = %request.model,
            chars = generation.text.len(),
            citations = generation.grounding.len(),
            provider = "gemini",
            "Generation completed"
        );

        Ok(generation)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
