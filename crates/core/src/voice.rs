// crates/core/src/voice.rs
//! Voice pipeline: transcribe → answer → synthesize.
//!
//! Stages run strictly in order and each consumes the previous stage's
//! output. The first failure aborts the run; callers get either a complete
//! [`VoiceReply`] or one [`VoiceError`] naming the stage that failed.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::ai::{AiError, AudioInput, ChatProvider, CompletionRequest, SpeechToText, TextToSpeech};
use crate::article::ArticleContext;

const ANSWER_SYSTEM_PROMPT: &str = "You are a friendly news companion answering spoken questions \
about one article. Answer in two or three short sentences of plain spoken English, \
with no markdown or lists. If the article does not cover the question, say so briefly.";

/// Everything produced by one voice-chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceReply {
    pub question: String,
    pub answer: String,
    pub audio: Vec<u8>,
}

/// Pipeline stage, used to tag errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcription,
    Generation,
    Synthesis,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Transcription => "transcription",
            Stage::Generation => "generation",
            Stage::Synthesis => "synthesis",
        }
    }
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("No audio received")]
    EmptyAudio,

    #[error("{} failed: {source}", stage.as_str())]
    Stage {
        stage: Stage,
        #[source]
        source: AiError,
    },

    #[error("{} produced no output", stage.as_str())]
    EmptyOutput { stage: Stage },
}

impl VoiceError {
    /// The stage that failed, if the error came from an external call.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            VoiceError::Stage { stage, .. } | VoiceError::EmptyOutput { stage } => Some(*stage),
            VoiceError::MissingField(_) | VoiceError::EmptyAudio => None,
        }
    }

    /// True when the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        self.stage().is_none()
    }
}

/// The three services a voice turn needs.
#[derive(Clone)]
pub struct VoicePipeline {
    stt: Arc<dyn SpeechToText>,
    chat: Arc<dyn ChatProvider>,
    tts: Arc<dyn TextToSpeech>,
}

impl VoicePipeline {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        chat: Arc<dyn ChatProvider>,
        tts: Arc<dyn TextToSpeech>,
    ) -> Self {
        Self { stt, chat, tts }
    }

    /// Answer a spoken question about `context`.
    pub async fn voice_chat(
        &self,
        audio: AudioInput,
        context: &ArticleContext,
    ) -> Result<VoiceReply, VoiceError> {
        if audio.bytes.is_empty() {
            return Err(VoiceError::EmptyAudio);
        }
        let start = Instant::now();

        let question = self
            .stt
            .transcribe(audio)
            .await
            .map_err(|source| stage_failed(Stage::Transcription, source))?;
        if question.trim().is_empty() {
            return Err(VoiceError::EmptyOutput { stage: Stage::Transcription });
        }

        let answer = self
            .chat
            .complete(
                CompletionRequest::text(answer_prompt(&question, context))
                    .with_system(ANSWER_SYSTEM_PROMPT)
                    .with_max_tokens(250),
            )
            .await
            .map_err(|source| stage_failed(Stage::Generation, source))?
            .content
            .trim()
            .to_string();
        if answer.is_empty() {
            return Err(VoiceError::EmptyOutput { stage: Stage::Generation });
        }

        let audio = self.synthesize(&answer).await?;

        tracing::info!(
            question_len = question.len(),
            answer_len = answer.len(),
            audio_len = audio.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "voice chat turn complete"
        );
        Ok(VoiceReply { question, answer, audio })
    }

    /// Read the article's title, summary and quote aloud.
    pub async fn audio_summary(&self, context: &ArticleContext) -> Result<Vec<u8>, VoiceError> {
        if let Some(field) = context.missing_field() {
            return Err(VoiceError::MissingField(field));
        }
        self.synthesize(&narration_script(context)).await
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let audio = self
            .tts
            .synthesize(text)
            .await
            .map_err(|source| stage_failed(Stage::Synthesis, source))?;
        if audio.is_empty() {
            return Err(VoiceError::EmptyOutput { stage: Stage::Synthesis });
        }
        Ok(audio)
    }
}

fn stage_failed(stage: Stage, source: AiError) -> VoiceError {
    tracing::warn!(stage = stage.as_str(), error = %source, "voice pipeline stage failed");
    VoiceError::Stage { stage, source }
}

fn answer_prompt(question: &str, context: &ArticleContext) -> String {
    format!(
        "Article title: {}\nArticle summary: {}\n\nQuestion: {}",
        context.title.trim(),
        context.summary.trim(),
        question.trim()
    )
}

/// Script read out by the audio summary.
pub fn narration_script(context: &ArticleContext) -> String {
    let mut script = format!("{} {}", end_sentence(&context.title), context.summary.trim());
    if let Some(quote) = context.quote() {
        script.push_str(&format!(" As one line puts it: \"{quote}\""));
    }
    script
}

fn end_sentence(text: &str) -> String {
    let text = text.trim();
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStt(Result<&'static str, u16>);
    struct FakeChat(Result<&'static str, u16>);
    struct FakeTts {
        result: Result<Vec<u8>, u16>,
        calls: AtomicUsize,
    }

    fn upstream(service: &'static str, status: u16) -> AiError {
        AiError::Upstream { service, status, body: String::new() }
    }

    #[async_trait]
    impl SpeechToText for FakeStt {
        async fn transcribe(&self, _audio: AudioInput) -> Result<String, AiError> {
            self.0.map(str::to_string).map_err(|s| upstream("transcription", s))
        }
    }

    #[async_trait]
    impl ChatProvider for FakeChat {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, AiError> {
            self.0
                .map(|content| CompletionResponse {
                    content: content.to_string(),
                    model: None,
                    input_tokens: None,
                    output_tokens: None,
                    latency_ms: 0,
                })
                .map_err(|s| upstream("chat", s))
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    #[async_trait]
    impl TextToSpeech for FakeTts {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|s| upstream("speech", s))
        }
    }

    fn tts(result: Result<Vec<u8>, u16>) -> Arc<FakeTts> {
        Arc::new(FakeTts { result, calls: AtomicUsize::new(0) })
    }

    fn pipeline(
        stt: Result<&'static str, u16>,
        chat: Result<&'static str, u16>,
        tts: Arc<FakeTts>,
    ) -> VoicePipeline {
        VoicePipeline::new(Arc::new(FakeStt(stt)), Arc::new(FakeChat(chat)), tts)
    }

    fn context() -> ArticleContext {
        ArticleContext::new("Chip export rules tightened", "New limits apply to accelerator sales.")
    }

    fn clip() -> AudioInput {
        AudioInput::webm(vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_voice_chat_returns_full_triple() {
        let p = pipeline(Ok("Who is affected?"), Ok(" Mainly cloud providers. "), tts(Ok(vec![9, 9])));
        let reply = p.voice_chat(clip(), &context()).await.unwrap();
        assert_eq!(reply.question, "Who is affected?");
        assert_eq!(reply.answer, "Mainly cloud providers.");
        assert_eq!(reply.audio, vec![9, 9]);
    }

    #[tokio::test]
    async fn test_transcription_failure_stops_pipeline() {
        let speech = tts(Ok(vec![1]));
        let p = pipeline(Err(503), Ok("unused"), speech.clone());
        let err = p.voice_chat(clip(), &context()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Transcription));
        assert_eq!(speech.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_transcript_is_an_error() {
        let p = pipeline(Ok("   "), Ok("unused"), tts(Ok(vec![1])));
        let err = p.voice_chat(clip(), &context()).await.unwrap_err();
        assert!(matches!(err, VoiceError::EmptyOutput { stage: Stage::Transcription }));
    }

    #[tokio::test]
    async fn test_generation_failure_is_tagged() {
        let p = pipeline(Ok("q"), Err(429), tts(Ok(vec![1])));
        let err = p.voice_chat(clip(), &context()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Generation));
        assert_eq!(err.to_string(), "generation failed: chat returned HTTP 429");
    }

    #[tokio::test]
    async fn test_synthesis_failure_returns_no_partial_reply() {
        let p = pipeline(Ok("q"), Ok("a"), tts(Err(500)));
        let err = p.voice_chat(clip(), &context()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Synthesis));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_empty_audio_is_client_error() {
        let p = pipeline(Ok("q"), Ok("a"), tts(Ok(vec![1])));
        let err = p.voice_chat(AudioInput::webm(Vec::new()), &context()).await.unwrap_err();
        assert!(matches!(err, VoiceError::EmptyAudio));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_audio_summary_requires_summary() {
        let speech = tts(Ok(vec![1]));
        let p = pipeline(Ok("q"), Ok("a"), speech.clone());
        let err = p
            .audio_summary(&ArticleContext::new("Title", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::MissingField("summary")));
        assert_eq!(speech.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_audio_summary_synthesizes_script() {
        let p = pipeline(Ok("q"), Ok("a"), tts(Ok(vec![0xff, 0xfb])));
        let audio = p.audio_summary(&context()).await.unwrap();
        assert_eq!(audio, vec![0xff, 0xfb]);
    }

    #[test]
    fn test_narration_script_includes_quote() {
        let ctx = context().with_quote("Export controls are industrial policy.");
        assert_eq!(
            narration_script(&ctx),
            "Chip export rules tightened. New limits apply to accelerator sales. \
             As one line puts it: \"Export controls are industrial policy.\""
        );
    }

    #[test]
    fn test_narration_script_does_not_double_punctuate() {
        let ctx = ArticleContext::new("Is AGI close?", "Experts disagree.");
        assert_eq!(narration_script(&ctx), "Is AGI close? Experts disagree.");
    }
}
