//! Input classification: decides which extraction plan an input gets.

use url::Url;

use crate::core::error::AuditError;
use crate::core::types::{Input, Kind};

/// File extensions treated as directly-fetchable media.
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "mp4", "wav", "m4a", "aac", "ogg", "flac", "webm", "mov", "avi", "mkv", "flv",
];

/// Hosts that serve video pages rather than articles.
const VIDEO_PLATFORM_HOSTS: &[&str] = &[
    "vimeo.com",
    "www.vimeo.com",
    "dailymotion.com",
    "www.dailymotion.com",
    "rumble.com",
];

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "www.youtu.be",
];

/// Classify an input into its extraction kind. Total over the declared input
/// set; anything else fails with an `InputInvalid` / `Unsupported` error.
pub fn classify(input: &Input) -> Result<Kind, AuditError> {
    match input {
        Input::Text { body } => {
            if body.trim().is_empty() {
                Err(AuditError::InputInvalid("empty text body".to_string()))
            } else {
                Ok(Kind::Text)
            }
        }
        Input::Url { href } => classify_url(href),
        Input::File {
            mime,
            filename,
            bytes,
        } => classify_file(mime, filename, bytes),
    }
}

fn classify_url(href: &str) -> Result<Kind, AuditError> {
    let parsed =
        Url::parse(href).map_err(|e| AuditError::InputInvalid(format!("malformed URL: {e}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AuditError::InputInvalid(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    if YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Ok(Kind::YouTube);
    }

    let path = parsed.path().to_ascii_lowercase();
    let has_media_ext = path
        .rsplit('.')
        .next()
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
        && path.contains('.');
    if has_media_ext || VIDEO_PLATFORM_HOSTS.contains(&host.as_str()) {
        return Ok(Kind::MediaUrl);
    }

    Ok(Kind::WebPage)
}

fn classify_file(mime: &str, filename: &str, bytes: &[u8]) -> Result<Kind, AuditError> {
    let mime = if mime.trim().is_empty() {
        // No declared type; guess from the filename, then the magic bytes.
        mime_guess::from_path(filename)
            .first_raw()
            .map(|m| m.to_string())
            .unwrap_or_else(|| sniff_mime(bytes).to_string())
    } else {
        mime.trim().to_ascii_lowercase()
    };

    if mime.starts_with("image/") {
        return Ok(Kind::Image);
    }
    if mime.starts_with("audio/") {
        return Ok(Kind::Audio);
    }
    if mime.starts_with("video/") {
        return Ok(Kind::Video);
    }
    if matches!(
        mime.as_str(),
        "application/pdf"
            | "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    ) {
        return Ok(Kind::Document);
    }

    Err(AuditError::Unsupported(format!(
        "unsupported MIME type '{mime}' for file '{filename}'"
    )))
}

/// Minimal magic-byte sniff for uploads with no declared or guessable type.
fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        "application/pdf"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"ID3") || bytes.starts_with(&[0xFF, 0xFB]) {
        "audio/mpeg"
    } else if bytes.starts_with(b"RIFF") {
        "audio/wav"
    } else if bytes.starts_with(b"PK") {
        // OOXML containers are zip archives.
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else {
        "application/octet-stream"
    }
}

/// Extract the video id from a YouTube URL.
pub fn youtube_video_id(href: &str) -> Option<String> {
    let parsed = Url::parse(href).ok()?;
    match parsed.host_str()? {
        "youtu.be" | "www.youtu.be" => parsed
            .path()
            .strip_prefix('/')
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string()),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" => {
            if let Some(id) = parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string())
            {
                return Some(id);
            }
            // Shorts and embed paths carry the id as the last segment.
            let path = parsed.path();
            for prefix in ["/shorts/", "/embed/", "/live/"] {
                if let Some(rest) = path.strip_prefix(prefix) {
                    let id = rest.split('/').next().unwrap_or("");
                    if !id.is_empty() {
                        return Some(id.to_string());
                    }
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(body: &str) -> Input {
        Input::Text {
            body: body.to_string(),
        }
    }

    fn url(href: &str) -> Input {
        Input::Url {
            href: href.to_string(),
        }
    }

    fn file(mime: &str, filename: &str) -> Input {
        Input::File {
            bytes: Vec::new(),
            filename: filename.to_string(),
            mime: mime.to_string(),
        }
    }

    #[test]
    fn text_requires_nonempty_body() {
        assert_eq!(classify(&text("hello")).unwrap(), Kind::Text);
        assert!(classify(&text("   ")).is_err());
    }

    #[test]
    fn youtube_hosts_classify_as_youtube() {
        for href in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(classify(&url(href)).unwrap(), Kind::YouTube, "{href}");
        }
    }

    #[test]
    fn media_extensions_classify_as_media_url() {
        assert_eq!(
            classify(&url("https://cdn.example.com/ads/promo.mp4")).unwrap(),
            Kind::MediaUrl
        );
        assert_eq!(
            classify(&url("https://cdn.example.com/jingle.mp3")).unwrap(),
            Kind::MediaUrl
        );
        assert_eq!(
            classify(&url("https://vimeo.com/12345")).unwrap(),
            Kind::MediaUrl
        );
    }

    #[test]
    fn plain_pages_classify_as_webpage() {
        assert_eq!(
            classify(&url("https://example.com/blog/post")).unwrap(),
            Kind::WebPage
        );
    }

    #[test]
    fn non_http_schemes_rejected() {
        assert!(classify(&url("ftp://example.com/file")).is_err());
        assert!(classify(&url("not a url")).is_err());
    }

    #[test]
    fn file_mime_mapping() {
        assert_eq!(classify(&file("image/png", "ad.png")).unwrap(), Kind::Image);
        assert_eq!(
            classify(&file("audio/mpeg", "spot.mp3")).unwrap(),
            Kind::Audio
        );
        assert_eq!(
            classify(&file("video/mp4", "spot.mp4")).unwrap(),
            Kind::Video
        );
        assert_eq!(
            classify(&file("application/pdf", "brochure.pdf")).unwrap(),
            Kind::Document
        );
        assert!(classify(&file("application/zip", "archive.zip")).is_err());
    }

    #[test]
    fn missing_mime_falls_back_to_filename() {
        assert_eq!(classify(&file("", "scan.pdf")).unwrap(), Kind::Document);
        assert_eq!(classify(&file("", "photo.jpg")).unwrap(), Kind::Image);
    }

    #[test]
    fn classification_is_stable() {
        let input = url("https://example.com/blog/post");
        assert_eq!(classify(&input).unwrap(), classify(&input).unwrap());
    }

    #[test]
    fn video_id_extraction() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/shorts/abc123xyz").as_deref(),
            Some("abc123xyz")
        );
        assert_eq!(youtube_video_id("https://example.com/watch?v=x"), None);
    }
}
