//! Claude-backed generator using Anthropic's Messages API

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use glossa_core::error::AppError;
use glossa_core::models::{ChatMessage, FlashcardDraft, QuizQuestion};
use glossa_core::Config;

use crate::{ContentGenerator, ExtractionOutput, ExtractionRequest, ExtractionSource};

const API_VERSION: &str = "2023-06-01";

/// Source text is clipped before prompting to bound request size.
const MAX_SOURCE_CHARS: usize = 50_000;

/// Generator backed by the Claude Messages API
pub struct AnthropicGenerator {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl Debug for AnthropicGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnthropicGenerator")
            .field("model", &self.model)
            .finish()
    }
}

// Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text { text: String },
}

impl AnthropicGenerator {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_seconds()))
            .build()
            .context("Failed to create HTTP client for the generation API")?;

        Ok(Self {
            http_client,
            api_url: config.generation_api_url().to_string(),
            api_key: config.anthropic_api_key().unwrap_or_default().to_string(),
            model: config.generation_model().to_string(),
            max_tokens: config.generation_max_tokens(),
        })
    }

    /// Call the Messages API and return the first text block of the reply.
    async fn complete(
        &self,
        system: Option<String>,
        messages: Vec<MessageParam>,
    ) -> Result<String, AppError> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system,
            messages,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::GenerationFailed(format!("Generation API request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::GenerationFailed(format!(
                "Generation API returned {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            AppError::GenerationFailed(format!("Failed to parse generation API response: {}", e))
        })?;

        let text = parsed
            .content
            .into_iter()
            .map(|b| match b {
                ContentBlockResponse::Text { text } => text,
            })
            .next()
            .unwrap_or_default();

        Ok(text)
    }

    /// Resolve a URL source into plain text. YouTube and article pages both
    /// go through the same fetch; markup is stripped before prompting.
    async fn fetch_source_text(&self, url: &str) -> Result<String, AppError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            AppError::GenerationFailed(format!("Failed to fetch source URL: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::GenerationFailed(format!(
                "Source URL returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            AppError::GenerationFailed(format!("Failed to read source URL body: {}", e))
        })?;

        Ok(strip_markup(&body))
    }

    fn build_extraction_prompt(title: &str, text: &str) -> String {
        format!(
            r#"You are a language-learning assistant. From the study text below, select the vocabulary a learner should retain and return ONLY a JSON array. Each element must have these fields:
- "term": the word or phrase in the source language
- "translation": its English translation
- "definition": a short learner-friendly definition, or null
- "context_snippet": the sentence from the text where the term appears, or null
- "grammar_note": a brief grammar remark, or null

Pick the most useful vocabulary, at most 30 items. Respond with the JSON array and nothing else.

Study text, titled "{}":

{}"#,
            title, text
        )
    }

    fn build_quiz_prompt(text: &str, num_questions: usize) -> String {
        format!(
            r#"Generate exactly {} quiz questions testing vocabulary and comprehension of the study text below. Return ONLY a JSON array. Each element must have these fields:
- "question": the question text
- "question_type": one of "multiple_choice", "true_false", "fill_blank"
- "options": for multiple_choice, an array of objects with "text" and "is_correct"; for other types an empty array
- "correct_answer": the expected answer string (for true_false use "true" or "false")
- "explanation": one sentence explaining the answer

Respond with the JSON array and nothing else.

Study text:

{}"#,
            num_questions, text
        )
    }

    fn build_chat_system_prompt(text: &str) -> String {
        format!(
            r#"You are a patient language tutor. Answer the learner's questions about the study material below: explain vocabulary, grammar and meaning, and keep answers short and concrete. If a question is unrelated to the material, gently steer back to it.

Study material:

{}"#,
            text
        )
    }
}

/// Pull the JSON payload out of a model reply, tolerating markdown fences.
fn extract_json_payload(text: &str) -> &str {
    if text.contains("```json") {
        text.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
            .trim()
    } else if text.contains("```") {
        text.split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
            .trim()
    } else {
        text.trim()
    }
}

fn parse_reply<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, AppError> {
    serde_json::from_str(extract_json_payload(text)).map_err(|e| {
        AppError::GenerationFailed(format!("Generation output was not valid JSON: {}", e))
    })
}

/// Reduce an HTML page to prompt-ready plain text: drop script and style
/// blocks, strip tags, collapse whitespace. Plain-text input passes through.
fn strip_markup(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    let mut skip_until: Option<&str> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(closer) = skip_until {
            if body[i..].len() >= closer.len() && body[i..].to_lowercase().starts_with(closer) {
                for _ in 0..closer.chars().count() - 1 {
                    chars.next();
                }
                skip_until = None;
            }
            continue;
        }
        if c == '<' {
            let rest = body[i..].to_lowercase();
            if rest.starts_with("<script") {
                skip_until = Some("</script>");
            } else if rest.starts_with("<style") {
                skip_until = Some("</style>");
            } else {
                // Plain tag: skip to the closing bracket.
                for (_, tc) in chars.by_ref() {
                    if tc == '>' {
                        break;
                    }
                }
                text.push(' ');
            }
            continue;
        }
        text.push(c);
    }

    let mut collapsed = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
                last_was_space = true;
            }
        } else {
            collapsed.push(c);
            last_was_space = false;
        }
    }
    collapsed.trim().to_string()
}

/// Clip to at most `max` characters on a char boundary.
fn clip_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[async_trait]
impl ContentGenerator for AnthropicGenerator {
    async fn extract_flashcards(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutput, AppError> {
        let text = match &request.source {
            ExtractionSource::Text(text) => text.clone(),
            ExtractionSource::Url { url, .. } => self.fetch_source_text(url).await?,
        };

        if text.trim().is_empty() {
            return Err(AppError::GenerationFailed(
                "Source resolved to empty text".to_string(),
            ));
        }

        let prompt = Self::build_extraction_prompt(&request.title, clip_chars(&text, MAX_SOURCE_CHARS));
        let reply = self
            .complete(
                None,
                vec![MessageParam {
                    role: "user".to_string(),
                    content: prompt,
                }],
            )
            .await?;

        let cards: Vec<FlashcardDraft> = parse_reply(&reply)?;
        let cards: Vec<FlashcardDraft> = cards
            .into_iter()
            .filter(|c| !c.term.trim().is_empty() && !c.translation.trim().is_empty())
            .collect();

        tracing::info!(
            title = %request.title,
            card_count = cards.len(),
            "Extracted flashcards from material"
        );

        Ok(ExtractionOutput { text, cards })
    }

    async fn generate_quiz(
        &self,
        source_text: &str,
        num_questions: usize,
    ) -> Result<Vec<QuizQuestion>, AppError> {
        let prompt =
            Self::build_quiz_prompt(clip_chars(source_text, MAX_SOURCE_CHARS), num_questions);
        let reply = self
            .complete(
                None,
                vec![MessageParam {
                    role: "user".to_string(),
                    content: prompt,
                }],
            )
            .await?;

        let mut questions: Vec<QuizQuestion> = parse_reply(&reply)?;
        questions.retain(|q| !q.prompt.trim().is_empty() && !q.correct_answer.trim().is_empty());
        questions.truncate(num_questions);

        if questions.is_empty() {
            return Err(AppError::GenerationFailed(
                "Generation produced no usable questions".to_string(),
            ));
        }

        Ok(questions)
    }

    async fn chat_reply(
        &self,
        source_text: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AppError> {
        let system = Self::build_chat_system_prompt(clip_chars(source_text, MAX_SOURCE_CHARS));

        let mut messages: Vec<MessageParam> = history
            .iter()
            .map(|m| MessageParam {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();
        messages.push(MessageParam {
            role: "user".to_string(),
            content: message.to_string(),
        });

        let reply = self.complete(Some(system), messages).await?;
        let reply = reply.trim().to_string();

        if reply.is_empty() {
            return Err(AppError::GenerationFailed(
                "Generation produced an empty reply".to_string(),
            ));
        }

        Ok(reply)
    }
}
