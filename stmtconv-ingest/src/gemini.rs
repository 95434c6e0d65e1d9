use std::future::Future;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use stmtconv_core::TransactionRecord;

use crate::document::StatementDocument;
use crate::error::ExtractError;
use crate::gateway::Extractor;
use crate::response;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 120,
        }
    }
}

const EXTRACTION_PROMPT: &str = "\
You are an assistant that reads bank statements. Extract every transaction from the attached PDF \
and return JSON in exactly this shape:

{
  \"transactions\": [
    {
      \"id\": \"unique_id\",
      \"date\": \"YYYY-MM-DD\",
      \"description\": \"what the transaction was\",
      \"debit\": amount paid out (number, 0 if none),
      \"credit\": amount paid in (number, 0 if none),
      \"balance\": running balance after the transaction (number),
      \"category\": \"best-guess category, e.g. food, transport, salary\",
      \"isValid\": true
    }
  ]
}

Rules:
1. Dates are always YYYY-MM-DD.
2. Amounts are plain numbers with no thousands separators or currency symbols.
3. Keep debits and credits strictly apart.
4. Copy the balance as printed; check that it follows from the previous row.
5. Give every transaction a unique id.
6. Keep the statement's order.
7. Reply with the JSON only, no commentary.

If part of a row cannot be read or is uncertain, set isValid to false for that row.";

/// Extractor backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiExtractor {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    /// Read the key from the configured environment variable.
    pub fn from_env(config: GeminiConfig) -> Result<Self, ExtractError> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractError::MissingCredential(config.api_key_env.clone()))?;
        Self::new(config, key.trim())
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, document: &StatementDocument) -> Result<String, ExtractError> {
        #[derive(Serialize)]
        struct InlineData {
            mime_type: String,
            data: String,
        }

        #[derive(Serialize)]
        #[serde(untagged)]
        enum Part {
            Text { text: String },
            Inline { inline_data: InlineData },
        }

        #[derive(Serialize)]
        struct Content {
            parts: Vec<Part>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f32,
            response_mime_type: String,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req {
            contents: Vec<Content>,
            generation_config: GenerationConfig,
        }

        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<PartOut>,
        }

        #[derive(Deserialize)]
        struct PartOut {
            text: Option<String>,
        }

        let body = Req {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: document.mime_type().to_string(),
                            data: BASE64.encode(document.bytes()),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
            },
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(v) = HeaderValue::from_str(&self.api_key) {
            headers.insert("x-goog-api-key", v);
        }

        log::debug!("POST {} ({} bytes of pdf)", self.endpoint(), document.len());
        let resp = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body: txt,
            });
        }

        let out: Resp = resp.json().await?;
        let mut text = String::new();
        for part in out
            .candidates
            .into_iter()
            .take(1)
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
        {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }
        Ok(text)
    }
}

impl Extractor for GeminiExtractor {
    fn extract(
        &self,
        document: &StatementDocument,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ExtractError>> + Send {
        async move {
            let text = self.generate(document).await?;
            let today = chrono::Local::now().date_naive();
            response::parse_model_text(&text, today)
        }
    }
}
