// crates/core/src/carousel.rs
//! LinkedIn carousel generation.
//!
//! A carousel is a short ordered list of slides summarising one article,
//! plus the caption for the post that carries it. Generation is a fixed
//! sequence of steps; after each one the caller's [`ProgressSink`] is told
//! how far along it is.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{AiError, ChatProvider, CompletionRequest};
use crate::article::ArticleContext;
use crate::text::truncate;

/// Slide limit for a quick preview run.
pub const PREVIEW_SLIDE_LIMIT: usize = 3;
/// Slide limit for a full run.
pub const FULL_SLIDE_LIMIT: usize = 8;

const MAX_HEADING_CHARS: usize = 80;
const MAX_BODY_CHARS: usize = 280;

const OUTLINE_SYSTEM_PROMPT: &str = r#"You turn AI news articles into LinkedIn carousels.
Respond with EXACTLY one JSON object of the form:
{"slides":[{"heading":"...","body":"..."}]}
The first slide is a hook, the last slide is a takeaway. Headings are short;
bodies are one or two plain sentences. No markdown, no emojis."#;

const CAPTION_SYSTEM_PROMPT: &str = "You write LinkedIn post captions. \
Respond with the caption text only: two or three sentences followed by at most three hashtags.";

/// Request to build a carousel for one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselRequest {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub preview_only: bool,
}

impl CarouselRequest {
    pub fn slide_limit(&self) -> usize {
        if self.preview_only {
            PREVIEW_SLIDE_LIMIT
        } else {
            FULL_SLIDE_LIMIT
        }
    }

    pub fn article(&self) -> ArticleContext {
        ArticleContext::new(self.title.clone(), self.summary.clone())
    }
}

/// One carousel slide. `index` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub index: u32,
    pub heading: String,
    pub body: String,
}

/// Finished carousel, stored as the job result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carousel {
    pub slides: Vec<Slide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub preview: bool,
}

/// Receives `(percent, message)` after each generation step.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

#[derive(Debug, Error)]
pub enum CarouselError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Slide generation failed: {0}")]
    Generation(#[source] AiError),

    #[error("Caption generation failed: {0}")]
    Caption(#[source] AiError),

    #[error("Model output could not be parsed as slides: {0}")]
    InvalidOutput(String),

    #[error("Model returned no slides")]
    NoSlides,
}

impl CarouselError {
    /// Message recorded on a failed job. The full error is for logs only.
    pub fn client_message(&self) -> String {
        match self {
            CarouselError::MissingField(field) => format!("Missing required field: {field}"),
            CarouselError::Generation(e) => format!("Slide generation failed: {}", e.summary()),
            CarouselError::Caption(e) => format!("Caption generation failed: {}", e.summary()),
            CarouselError::InvalidOutput(_) => "Model output could not be parsed as slides".to_string(),
            CarouselError::NoSlides => "Model returned no slides".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSlides {
    Wrapped { slides: Vec<RawSlide> },
    Bare(Vec<RawSlide>),
}

#[derive(Debug, Deserialize)]
struct RawSlide {
    #[serde(default, alias = "title")]
    heading: String,
    #[serde(default, alias = "text", alias = "content")]
    body: String,
}

/// Runs the carousel generation steps against a chat provider.
pub struct CarouselGenerator {
    chat: Arc<dyn ChatProvider>,
}

impl CarouselGenerator {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    pub async fn generate(
        &self,
        request: &CarouselRequest,
        progress: &dyn ProgressSink,
    ) -> Result<Carousel, CarouselError> {
        if let Some(field) = request.article().missing_field() {
            return Err(CarouselError::MissingField(field));
        }
        let limit = request.slide_limit();

        progress.report(10, "Drafting carousel outline");
        let outline = self
            .chat
            .complete(
                CompletionRequest::text(outline_prompt(request, limit))
                    .with_system(OUTLINE_SYSTEM_PROMPT)
                    .with_max_tokens(1200)
                    .json(),
            )
            .await
            .map_err(CarouselError::Generation)?;
        tracing::debug!(
            model = %self.chat.model(),
            latency_ms = outline.latency_ms,
            "carousel outline received"
        );

        progress.report(40, "Parsing slides");
        let raw = parse_slides(&outline.content)?;

        let total = raw.len().min(limit);
        let mut slides = Vec::with_capacity(total);
        for (i, slide) in raw.into_iter().take(limit).enumerate() {
            let formatted = format_slide(i, slide);
            if formatted.heading.is_empty() && formatted.body.is_empty() {
                continue;
            }
            slides.push(Slide {
                index: slides.len() as u32 + 1,
                ..formatted
            });
            let percent = 40 + (40 * (i + 1) / total) as u8;
            progress.report(percent, &format!("Formatting slide {} of {}", i + 1, total));
        }
        if slides.is_empty() {
            return Err(CarouselError::NoSlides);
        }

        let caption = if request.preview_only {
            None
        } else {
            progress.report(85, "Writing post caption");
            let response = self
                .chat
                .complete(
                    CompletionRequest::text(caption_prompt(request, &slides))
                        .with_system(CAPTION_SYSTEM_PROMPT)
                        .with_max_tokens(300),
                )
                .await
                .map_err(CarouselError::Caption)?;
            Some(response.content.trim().to_string()).filter(|c| !c.is_empty())
        };

        Ok(Carousel {
            slides,
            caption,
            preview: request.preview_only,
        })
    }
}

fn outline_prompt(request: &CarouselRequest, limit: usize) -> String {
    format!(
        "Write a carousel of at most {limit} slides for this article.\n\nTitle: {}\n\nSummary: {}",
        request.title.trim(),
        request.summary.trim()
    )
}

fn caption_prompt(request: &CarouselRequest, slides: &[Slide]) -> String {
    let headings: Vec<&str> = slides.iter().map(|s| s.heading.as_str()).collect();
    format!(
        "Article: {}\nCarousel slides: {}\n\nWrite the post caption.",
        request.title.trim(),
        headings.join(" | ")
    )
}

/// Model output is logged up to this many bytes when it fails to parse.
const LOGGED_OUTPUT_LIMIT: usize = 300;

/// Parse model output into raw slides.
///
/// Accepts a bare array or `{"slides": [...]}`, optionally wrapped in a
/// markdown code fence.
fn parse_slides(content: &str) -> Result<Vec<RawSlide>, CarouselError> {
    let json = strip_code_fence(content);
    let raw: RawSlides = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(
            content = %truncate(content, LOGGED_OUTPUT_LIMIT),
            "carousel output is not valid slide JSON"
        );
        CarouselError::InvalidOutput(e.to_string())
    })?;
    let slides = match raw {
        RawSlides::Wrapped { slides } => slides,
        RawSlides::Bare(slides) => slides,
    };
    if slides.is_empty() {
        return Err(CarouselError::NoSlides);
    }
    Ok(slides)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn format_slide(position: usize, raw: RawSlide) -> Slide {
    Slide {
        index: position as u32 + 1,
        heading: clip(raw.heading.trim(), MAX_HEADING_CHARS),
        body: clip(raw.body.trim(), MAX_BODY_CHARS),
    }
}

/// Cut to `max` characters, ending with an ellipsis when shortened.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
