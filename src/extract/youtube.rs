//! YouTube extraction strategies: published captions first, public oEmbed
//! metadata as fallback, and the (default-off) audio-download path last.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use yt_transcript_rs::YouTubeTranscriptApi;

use crate::core::error::AuditError;
use crate::core::types::{ContentFormat, SourceType};
use crate::extract::media::transcribe_with_deadline;
use crate::extract::{ExtractCtx, Extraction, Extractor};
use crate::fingerprint::youtube_video_id;
use crate::procutil;

/// Caption languages tried in preference order.
const CAPTION_LANGUAGES: &[&str] = &["en", "hi"];

// ---------------------------------------------------------------------------
// CaptionTrack
// ---------------------------------------------------------------------------

/// Fetches published captions for the video and concatenates the segments.
pub struct CaptionTrack;

#[async_trait]
impl Extractor for CaptionTrack {
    fn name(&self) -> &'static str {
        "caption_track"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(70)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?;
        let video_id = youtube_video_id(url.as_str())
            .ok_or_else(|| AuditError::InputInvalid("no YouTube video id in URL".to_string()))?;

        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| AuditError::FetchNetwork(format!("caption client: {e}")))?;

        let transcript = api
            .fetch_transcript(&video_id, CAPTION_LANGUAGES, false)
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("caption fetch: {e}")))?;

        let text = transcript.text();
        if text.trim().is_empty() {
            return Err(AuditError::ContentTooShort { len: 0 });
        }
        info!(video_id, chars = text.len(), "caption track fetched");

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Youtube,
            ContentFormat::Speech,
        ))
    }
}

// ---------------------------------------------------------------------------
// OEmbed
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
    #[serde(default)]
    author_name: String,
}

/// Public oEmbed metadata (title, channel). A metadata-only fallback when
/// captions are unavailable.
pub struct OEmbed;

#[async_trait]
impl Extractor for OEmbed {
    fn name(&self) -> &'static str {
        "oembed"
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(70)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?;
        let endpoint = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            url.as_str()
        );

        let body = ctx.fetcher().get(&endpoint, &ctx.cancel).await?;
        let meta: OEmbedResponse = serde_json::from_slice(&body.bytes)
            .map_err(|e| AuditError::FetchNetwork(format!("oembed parse: {e}")))?;

        let mut extraction = Extraction::new(
            format!("Title: {}; Channel: {}", meta.title, meta.author_name),
            self.name(),
            SourceType::Youtube,
            ContentFormat::Article,
        );
        extraction.metadata_only = true;
        Ok(extraction)
    }
}

// ---------------------------------------------------------------------------
// AudioDownloader + TranscribeAudio
// ---------------------------------------------------------------------------

/// Downloads best audio as MP3 via `yt-dlp` and hands it to the transcriber.
/// Feature-gated (`ENABLE_AUDIO_DOWNLOAD`); off by default in production.
pub struct AudioDownloader;

impl AudioDownloader {
    async fn probe_duration(
        ctx: &ExtractCtx<'_>,
        audio_path: &std::path::Path,
    ) -> Option<f64> {
        let ffprobe = which::which("ffprobe").ok()?;
        let path_arg = audio_path.to_string_lossy();
        let out = procutil::run(
            &ffprobe,
            &[
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "csv=p=0",
                path_arg.as_ref(),
            ],
            ctx.workdir,
            Duration::from_secs(15),
            &ctx.cancel,
        )
        .await
        .ok()?;
        String::from_utf8_lossy(&out.stdout).trim().parse().ok()
    }
}

#[async_trait]
impl Extractor for AudioDownloader {
    fn name(&self) -> &'static str {
        "audio_download"
    }

    fn budget(&self) -> Duration {
        // Download budget plus transcription budget, with slack.
        Duration::from_secs(120 + 180 + 20)
    }

    async fn extract(&self, ctx: &ExtractCtx<'_>) -> Result<Extraction, AuditError> {
        let url = ctx.require_url()?;
        let config = &ctx.services.config;

        let ytdlp = which::which("yt-dlp")
            .map_err(|_| AuditError::FetchNetwork("yt-dlp not installed".to_string()))?;

        let out = procutil::run(
            &ytdlp,
            &[
                "-x",
                "--audio-format",
                "mp3",
                "--no-playlist",
                "-o",
                "audio.%(ext)s",
                url.as_str(),
            ],
            ctx.workdir,
            config.audio_download_timeout,
            &ctx.cancel,
        )
        .await?;
        if !out.success() {
            return Err(AuditError::FetchNetwork(format!(
                "yt-dlp exited with {:?}: {}",
                out.status_code,
                out.stderr.lines().last().unwrap_or("")
            )));
        }

        let audio_path = ctx.workdir.join("audio.mp3");
        let meta = tokio::fs::metadata(&audio_path)
            .await
            .map_err(|_| AuditError::FetchNetwork("downloaded audio missing".to_string()))?;
        if meta.len() == 0 {
            return Err(AuditError::FetchNetwork("downloaded audio is empty".to_string()));
        }
        if meta.len() > config.max_media_size {
            return Err(AuditError::PayloadTooLarge {
                limit: config.max_media_size,
            });
        }
        if let Some(duration) = Self::probe_duration(ctx, &audio_path).await {
            if duration <= 0.0 {
                return Err(AuditError::FetchNetwork(
                    "downloaded audio has zero duration".to_string(),
                ));
            }
            info!(duration_secs = duration, "audio downloaded");
        } else {
            warn!("ffprobe unavailable; skipping duration validation");
        }

        let audio = tokio::fs::read(&audio_path)
            .await
            .map_err(|e| AuditError::FetchNetwork(format!("read audio: {e}")))?;

        let text = transcribe_with_deadline(ctx, &audio, "audio/mpeg").await?;

        Ok(Extraction::new(
            text,
            self.name(),
            SourceType::Youtube,
            ContentFormat::Speech,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oembed_response_parses_without_author() {
        let meta: OEmbedResponse =
            serde_json::from_str(r#"{"title":"Product demo"}"#).unwrap();
        assert_eq!(meta.title, "Product demo");
        assert!(meta.author_name.is_empty());
    }
}
