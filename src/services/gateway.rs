//! Gateway to the external nutrition-analysis service (Gemini
//! `generateContent`). The service receives the capture plus profile context
//! and must answer with a JSON document matching the published schema; the
//! response goes through an explicit decode-and-validate step and is rejected
//! on any mismatch.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::{HealthVerdict, Macros, NutritionAnalysis, Profile, Settings};

// ─── Constants ───

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;

// ─── Errors ───

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis is not configured: API key is missing")]
    MissingApiKey,
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analysis service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("analysis service returned no content")]
    EmptyResponse,
    #[error("analysis response did not match the expected schema: {0}")]
    SchemaViolation(String),
}

// ─── Capability ───

/// Narrow seam over the external analysis service, so the session layer can
/// run against a mock instead of a network dependency.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        image_base64: Option<&str>,
        text_description: Option<&str>,
        profile: &Profile,
    ) -> Result<NutritionAnalysis, AnalysisError>;
}

// ─── Wire types ───

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ─── Decode and validate ───

/// Raw response shape. Required fields are hard-required here; numbers come
/// in as f64 and enum tokens as strings, validated below.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    food_name: String,
    calories: f64,
    macros: RawMacros,
    burn_time_minutes: f64,
    score: f64,
    verdict: String,
    #[serde(default)]
    secondary_verdicts: Vec<String>,
    goal_alignment: String,
    portion_guidance: String,
    frequency_guidance: String,
    #[serde(default)]
    allergens: Vec<String>,
    #[serde(default)]
    risk_flags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawMacros {
    protein: f64,
    carbs: f64,
    fat: f64,
}

impl RawAnalysis {
    /// Verdict tokens must be within the published set and the score within
    /// 0-100, otherwise the whole response is rejected. The secondary list is
    /// stored as returned; the request asks for at most 2 but the length is
    /// not enforced here.
    fn validate(self) -> Result<NutritionAnalysis, AnalysisError> {
        let verdict = parse_verdict(&self.verdict)?;
        let secondary_verdicts = self
            .secondary_verdicts
            .iter()
            .map(|token| parse_verdict(token))
            .collect::<Result<Vec<_>, _>>()?;
        if !(0.0..=100.0).contains(&self.score) {
            return Err(AnalysisError::SchemaViolation(format!(
                "score {} out of range",
                self.score
            )));
        }
        Ok(NutritionAnalysis {
            food_name: self.food_name,
            calories: self.calories,
            macros: Macros {
                protein: self.macros.protein,
                carbs: self.macros.carbs,
                fat: self.macros.fat,
            },
            burn_time_minutes: self.burn_time_minutes,
            score: self.score.round() as u8,
            verdict,
            secondary_verdicts,
            goal_alignment: self.goal_alignment,
            portion_guidance: self.portion_guidance,
            frequency_guidance: self.frequency_guidance,
            allergens: self.allergens,
            risk_flags: self.risk_flags,
        })
    }
}

fn parse_verdict(token: &str) -> Result<HealthVerdict, AnalysisError> {
    HealthVerdict::parse(token)
        .ok_or_else(|| AnalysisError::SchemaViolation(format!("unknown verdict '{token}'")))
}

fn parse_analysis_text(text: &str) -> Result<NutritionAnalysis, AnalysisError> {
    let raw: RawAnalysis =
        serde_json::from_str(text).map_err(|e| AnalysisError::SchemaViolation(e.to_string()))?;
    raw.validate()
}

// ─── Request building ───

fn build_prompt(profile: &Profile) -> String {
    format!(
        "Analyze this meal for a user with the following profile:\n\
         Goal: {goal}\n\
         Gender: {sex}\n\
         Weight: {weight}kg\n\
         Height: {height}cm\n\
         Daily Calorie Target: {target}\n\
         \n\
         Provide a structured nutrition brief.\n\
         If an image is provided, analyze the visual portion size and ingredients.\n\
         If text is provided, estimate based on standard serving sizes for that description.\n\
         \n\
         The 'verdict' should be a professional, high-end assessment.\n\
         'goalAlignment' must specifically reference whether this helps them {goal}.\n\
         'burnTimeMinutes' is based on a brisk walk (approx 4mph).\n\
         'score' is a 0-100 rating of how healthy this meal is for THIS user's specific goals \
         (100 = perfect, 0 = terrible).\n\
         \n\
         Return STRICT JSON matching the schema.",
        goal = profile.goal.as_str(),
        sex = profile.sex.as_str(),
        weight = profile.weight_kg,
        height = profile.height_cm,
        target = profile.daily_calorie_target,
    )
}

fn nutrition_response_schema() -> serde_json::Value {
    let verdicts: serde_json::Value =
        HealthVerdict::ALL.iter().map(|v| v.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "foodName": { "type": "STRING", "description": "A concise, normalized name of the food." },
            "calories": { "type": "NUMBER", "description": "Estimated total calories." },
            "macros": {
                "type": "OBJECT",
                "properties": {
                    "protein": { "type": "NUMBER" },
                    "carbs": { "type": "NUMBER" },
                    "fat": { "type": "NUMBER" }
                },
                "required": ["protein", "carbs", "fat"]
            },
            "burnTimeMinutes": { "type": "NUMBER", "description": "Minutes of brisk walking required to burn these calories." },
            "score": { "type": "NUMBER", "description": "A health score from 0-100 where 100 is perfectly healthy." },
            "verdict": { "type": "STRING", "enum": verdicts.clone(), "description": "Primary health verdict." },
            "secondaryVerdicts": {
                "type": "ARRAY",
                "items": { "type": "STRING", "enum": verdicts },
                "description": "Up to 2 secondary verdicts if relevant."
            },
            "goalAlignment": { "type": "STRING", "description": "One sentence on alignment with the user's specific goal." },
            "portionGuidance": { "type": "STRING", "description": "Guidance on the portion size tailored to the user." },
            "frequencyGuidance": { "type": "STRING", "description": "How often this should be eaten." },
            "allergens": { "type": "ARRAY", "items": { "type": "STRING" }, "description": "List of common allergens if detected." },
            "riskFlags": { "type": "ARRAY", "items": { "type": "STRING" }, "description": "Short strings for risks like High Sugar, Trans Fat, etc." }
        },
        "required": [
            "foodName", "calories", "macros", "burnTimeMinutes", "score",
            "verdict", "goalAlignment", "portionGuidance", "frequencyGuidance"
        ]
    })
}

/// Strips any `data:image/...;base64,` prefix so only the raw payload is
/// transmitted.
fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some(idx) = data.find(";base64,") {
            return &data[idx + ";base64,".len()..];
        }
    }
    data
}

/// MIME type carried by a data URL, if any.
fn data_url_mime(data: &str) -> Option<&str> {
    let rest = data.strip_prefix("data:")?;
    let end = rest.find(';')?;
    Some(&rest[..end])
}

// ─── Gemini implementation ───

pub struct GeminiAnalyzer {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiAnalyzer {
    pub fn new(api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: API_BASE_URL.to_string(),
            client,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AnalysisError> {
        let api_key = settings.ai.api_key.trim();
        if api_key.is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        let model = settings.ai.model.trim();
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };
        Ok(Self::new(api_key, model))
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request(
        image_base64: Option<&str>,
        text_description: Option<&str>,
        profile: &Profile,
    ) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: build_prompt(profile),
        }];
        if let Some(text) = text_description.filter(|t| !t.trim().is_empty()) {
            parts.push(Part::Text {
                text: format!("Food Description: {}", text.trim()),
            });
        }
        if let Some(image) = image_base64.filter(|i| !i.trim().is_empty()) {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: data_url_mime(image).unwrap_or("image/jpeg").to_string(),
                    data: strip_data_url_prefix(image).to_string(),
                },
            });
        }
        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: nutrition_response_schema(),
            },
        }
    }

    async fn send_once(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, AnalysisError> {
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let payload: GenerateContentResponse = response.json().await?;
        if let Some(error) = payload.error {
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body: error.message,
            });
        }
        let text: String = payload
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| match p {
                Part::Text { text } => Some(text),
                Part::InlineData { .. } => None,
            })
            .collect();
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(text)
    }
}

fn is_retryable(err: &AnalysisError) -> bool {
    match err {
        AnalysisError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        AnalysisError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    /// One logical invocation: bounded retry with backoff on transport
    /// failures and 5xx, then the decode-and-validate step. Schema
    /// violations and 4xx are terminal.
    async fn analyze(
        &self,
        image_base64: Option<&str>,
        text_description: Option<&str>,
        profile: &Profile,
    ) -> Result<NutritionAnalysis, AnalysisError> {
        if self.api_key.is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        let request = Self::build_request(image_base64, text_description, profile);
        let url = self.build_url();

        let mut attempt = 0;
        let text = loop {
            attempt += 1;
            match self.send_once(&url, &request).await {
                Ok(text) => break text,
                Err(err) if attempt < MAX_ATTEMPTS && is_retryable(&err) => {
                    log::warn!("analysis attempt {attempt} failed, retrying: {err}");
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BACKOFF_MS * u64::from(attempt),
                    ))
                    .await;
                }
                Err(err) => return Err(err),
            }
        };
        parse_analysis_text(&text)
    }
}
