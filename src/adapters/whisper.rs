//! Whisper-compatible speech-to-text adapter for the transcriber seam.

use async_trait::async_trait;
use tracing::debug;

use crate::core::error::AuditError;
use crate::core::services::Transcriber;

pub struct WhisperTranscriber {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    pub fn from_env(http: reqwest::Client) -> Self {
        let base_url = ["TRANSCRIBER_BASE_URL", "OPENAI_BASE_URL"]
            .iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let api_key = ["TRANSCRIBER_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()));
        let model = std::env::var("TRANSCRIBER_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "whisper-1".to_string());
        Self::new(http, base_url, api_key, model)
    }

    fn filename_for(mime: &str) -> &'static str {
        match mime {
            "audio/wav" | "audio/x-wav" => "audio.wav",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "audio.m4a",
            "audio/ogg" => "audio.ogg",
            "video/mp4" => "video.mp4",
            "video/webm" | "audio/webm" => "media.webm",
            _ => "audio.mp3",
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, AuditError> {
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(Self::filename_for(mime))
            .mime_str(mime)
            .map_err(|e| AuditError::FetchNetwork(format!("bad media type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "text");

        let mut request = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("transcription request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuditError::FetchNetwork(format!(
                "transcriber HTTP {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("transcription body: {e}")))?;
        debug!(chars = text.len(), "transcription complete");
        Ok(text)
    }
}
